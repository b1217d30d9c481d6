//! Filesystem locations for the index database.

use std::path::PathBuf;

use crate::errors::{IndexError, IndexResult};

/// Resolve the index database path.
///
/// An explicit override wins; otherwise the database lives in the XDG data
/// directory (`~/.local/share/sibyl/index.db`).
pub fn resolve_db_path(override_path: Option<&str>) -> IndexResult<PathBuf> {
    if let Some(path) = override_path {
        return Ok(PathBuf::from(path));
    }

    let data_dir = dirs::data_dir().ok_or(IndexError::MissingDataDir)?;
    Ok(data_dir.join("sibyl").join("index.db"))
}
