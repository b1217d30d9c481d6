//! Character-based document splitting.
//!
//! Splits text on paragraph, then line, then word boundaries before falling
//! back to a hard character split, and merges the fragments back into chunks
//! of at most `chunk_size` characters with `overlap` characters carried over
//! from the tail of the previous chunk.

use crate::models::NewChunk;

const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Split a document into store-ready chunks.
pub fn split_document(source: &str, text: &str, chunk_size: usize, overlap: usize) -> Vec<NewChunk> {
    split_text(text, chunk_size, overlap)
        .into_iter()
        .enumerate()
        .map(|(index, content)| NewChunk {
            source: source.to_string(),
            chunk_index: index as i64,
            content,
        })
        .collect()
}

/// Split raw text into pieces of roughly `chunk_size` characters.
///
/// Fragments never exceed `chunk_size` on their own; a packed chunk may
/// exceed it by up to `overlap + 1` characters when a full-size fragment
/// lands after a carried tail. Whitespace-only input produces no chunks.
/// `overlap` is clamped below `chunk_size`.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size.saturating_sub(1));

    let fragments = split_recursive(trimmed, chunk_size, &SEPARATORS);
    merge_fragments(fragments, chunk_size, overlap)
}

fn split_recursive(text: &str, chunk_size: usize, separators: &[&str]) -> Vec<String> {
    if char_len(text) <= chunk_size {
        return vec![text.to_string()];
    }

    let Some((separator, rest)) = separators.split_first() else {
        return hard_split(text, chunk_size);
    };

    let mut fragments = Vec::new();
    for piece in text.split(separator) {
        let piece = piece.trim_matches('\n');
        if piece.trim().is_empty() {
            continue;
        }
        if char_len(piece) <= chunk_size {
            fragments.push(piece.to_string());
        } else {
            fragments.extend(split_recursive(piece, chunk_size, rest));
        }
    }

    fragments
}

/// Greedily pack fragments into chunks, seeding each chunk after the first
/// with the tail of its predecessor.
fn merge_fragments(fragments: Vec<String>, chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for fragment in fragments {
        let fragment_len = char_len(&fragment);
        let joiner_len = if current_len == 0 { 0 } else { 1 };

        if current_len + joiner_len + fragment_len > chunk_size && current_len > 0 {
            chunks.push(current.clone());
            let tail = char_tail(&current, overlap);
            current = tail;
            current_len = char_len(&current);
        }

        if current_len > 0 {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(&fragment);
        current_len += fragment_len;
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }

    chunks
}

fn hard_split(text: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_size)
        .map(|window| window.iter().collect())
        .collect()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn char_tail(text: &str, len: usize) -> String {
    if len == 0 {
        return String::new();
    }
    let chars: Vec<char> = text.chars().collect();
    let start = chars.len().saturating_sub(len);
    chars[start..].iter().collect()
}
