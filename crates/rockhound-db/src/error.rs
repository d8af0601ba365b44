//! Error types for the persistence layer.
//!
//! Load never fails on bad content (it falls back field by field); these
//! errors cover I/O and encoding on the save path.

use std::path::PathBuf;

/// Errors that can occur in the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Reading or writing the state file failed.
    #[error("state file I/O error at {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Encoding the state failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
