use std::path::Path;
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use libsqlite3_sys::{SQLITE_OK, sqlite3, sqlite3_api_routines, sqlite3_auto_extension};
use sha2::{Digest, Sha256};
use sqlite_vec::sqlite3_vec_init;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use uuid::Uuid;

use crate::embeddings::Embedder;
use crate::errors::{IndexError, IndexResult};
use crate::models::NewChunk;

static SQLITE_VEC_INIT_RC: OnceLock<i32> = OnceLock::new();

/// Persistent store of document chunks and their embedding vectors.
///
/// Chunks are immutable once added; the only way to remove them is a full
/// [`DocumentStore::reset`]. Concurrent reads during writes are supported by
/// SQLite WAL mode; a chunk added mid-query need not be visible to an
/// in-flight retrieval.
#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
    embedding_dim: usize,
}

/// A nearest-neighbour candidate hydrated with its stored embedding,
/// consumed by the MMR re-ranker.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub id: String,
    pub source: String,
    pub chunk_index: i64,
    pub content: String,
    pub embedding: Vec<f32>,
}

impl DocumentStore {
    pub async fn open(
        db_path: &Path,
        embedder: Arc<dyn Embedder>,
        embedding_dim: usize,
    ) -> IndexResult<Self> {
        init_sqlite_vec_once()?;
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode = WAL")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA synchronous = NORMAL")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        ensure_vec_table(&pool, embedding_dim).await?;

        Ok(Self {
            pool,
            embedder,
            embedding_dim,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub(crate) fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Embed and persist a batch of chunks. No-op on empty input.
    ///
    /// Chunks whose source and content hash match an already stored chunk
    /// are skipped, so re-uploading the same document does not duplicate the
    /// index or re-embed unchanged text. The batch is written in one
    /// transaction; a mid-batch failure leaves the store untouched.
    ///
    /// Returns the number of chunks newly added.
    pub async fn add(&self, chunks: &[NewChunk]) -> IndexResult<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut fresh: Vec<(&NewChunk, String)> = Vec::new();
        for chunk in chunks {
            let content_hash = format!("{:x}", Sha256::digest(chunk.content.as_bytes()));
            let existing: Option<(i64,)> = sqlx::query_as(
                "SELECT id FROM chunks WHERE source = ? AND content_hash = ? LIMIT 1",
            )
            .bind(&chunk.source)
            .bind(&content_hash)
            .fetch_optional(&self.pool)
            .await?;

            if existing.is_none() {
                fresh.push((chunk, content_hash));
            }
        }

        if fresh.is_empty() {
            tracing::debug!("all {} chunks already indexed", chunks.len());
            return Ok(0);
        }

        let inputs: Vec<String> = fresh.iter().map(|(c, _)| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&inputs).await?;

        if embeddings.len() != fresh.len() {
            return Err(IndexError::Embedding(format!(
                "embedding count mismatch: {} chunks, {} vectors",
                fresh.len(),
                embeddings.len()
            )));
        }

        let mut tx = self.pool.begin().await?;
        for ((chunk, content_hash), embedding) in fresh.iter().zip(&embeddings) {
            if embedding.len() != self.embedding_dim {
                return Err(IndexError::EmbeddingDimMismatch {
                    expected: self.embedding_dim,
                    actual: embedding.len(),
                });
            }

            let payload = serde_json::to_string(embedding)
                .map_err(|e| IndexError::Embedding(format!("embedding serialize failed: {e}")))?;

            let result = sqlx::query(
                r#"INSERT INTO chunks (chunk_id, source, chunk_index, content, content_hash, embedding, created_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&chunk.source)
            .bind(chunk.chunk_index)
            .bind(&chunk.content)
            .bind(content_hash)
            .bind(&payload)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;

            let rowid = result.last_insert_rowid();
            sqlx::query("INSERT OR REPLACE INTO chunk_vec(rowid, embedding) VALUES (?, ?)")
                .bind(rowid)
                .bind(&payload)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::info!(
            "Indexed {} chunks ({} already present)",
            fresh.len(),
            chunks.len() - fresh.len()
        );
        Ok(fresh.len())
    }

    /// Number of stored chunks. Returns 0 on any internal error.
    pub async fn count(&self) -> i64 {
        match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("chunk count failed: {e}");
                0
            }
        }
    }

    /// Remove every stored chunk.
    pub async fn reset(&self) -> IndexResult<()> {
        sqlx::query("DELETE FROM chunks").execute(&self.pool).await?;
        sqlx::query("DELETE FROM chunk_vec")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Fetch the `limit` nearest chunks to `embedding` by vector distance.
    pub(crate) async fn nearest(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> IndexResult<Vec<Candidate>> {
        let payload = serde_json::to_string(embedding)
            .map_err(|e| IndexError::Embedding(format!("embedding serialize failed: {e}")))?;

        let rows = sqlx::query_as::<_, (String, String, i64, String, String)>(
            r#"SELECT c.chunk_id, c.source, c.chunk_index, c.content, c.embedding
               FROM chunk_vec v
               JOIN chunks c ON c.id = v.rowid
               WHERE v.embedding MATCH ? AND v.k = ?
               ORDER BY v.distance ASC"#,
        )
        .bind(&payload)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for (id, source, chunk_index, content, stored) in rows {
            let embedding: Vec<f32> = serde_json::from_str(&stored)
                .map_err(|e| IndexError::Embedding(format!("stored embedding corrupt: {e}")))?;
            candidates.push(Candidate {
                id,
                source,
                chunk_index,
                content,
                embedding,
            });
        }

        Ok(candidates)
    }
}

fn init_sqlite_vec_once() -> IndexResult<()> {
    let rc = *SQLITE_VEC_INIT_RC.get_or_init(|| unsafe {
        type SqliteVecInitFn =
            unsafe extern "C" fn(*mut sqlite3, *mut *const i8, *const sqlite3_api_routines) -> i32;

        sqlite3_auto_extension(Some(std::mem::transmute::<*const (), SqliteVecInitFn>(
            sqlite3_vec_init as *const (),
        )))
    });

    if rc == SQLITE_OK {
        Ok(())
    } else {
        Err(IndexError::SqliteVec(format!(
            "sqlite-vec init failed with code {rc}"
        )))
    }
}

async fn ensure_vec_table(pool: &SqlitePool, embedding_dim: usize) -> IndexResult<()> {
    let existing: Option<(String,)> =
        sqlx::query_as("SELECT value FROM meta WHERE key = 'embedding_dim' LIMIT 1")
            .fetch_optional(pool)
            .await?;

    if let Some((value,)) = existing {
        let stored = value.parse::<usize>().unwrap_or(0);
        if stored != embedding_dim {
            return Err(IndexError::EmbeddingDimMismatch {
                expected: stored,
                actual: embedding_dim,
            });
        }
    }

    let table_exists: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'chunk_vec'",
    )
    .fetch_optional(pool)
    .await?;

    if table_exists.is_none() {
        let create_sql = format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS chunk_vec USING vec0(embedding float[{}])",
            embedding_dim
        );
        sqlx::query(&create_sql).execute(pool).await?;
    }

    sqlx::query("INSERT OR REPLACE INTO meta (key, value) VALUES ('embedding_dim', ?)")
        .bind(embedding_dim.to_string())
        .execute(pool)
        .await?;

    Ok(())
}
