//! File I/O helpers with path-tagged errors.

use std::path::Path;

use crate::error::StorageError;

/// Reads a UTF-8 text file, tagging failures with the path.
pub fn read_file(path: &Path) -> Result<String, StorageError> {
    std::fs::read_to_string(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })
}
