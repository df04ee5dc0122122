//! Error types for the ignore crate.

use std::path::PathBuf;

/// Errors that can occur while loading ignore rules.
#[derive(Debug, thiserror::Error)]
pub enum IgnoreError {
    /// An ignore file exists but could not be read.
    #[error("failed to read ignore file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The relative directory escapes the repository root.
    #[error("directory escapes repository root: {0}")]
    OutsideRoot(String),
}

/// Convenience alias for ignore results.
pub type IgnoreResult<T> = Result<T, IgnoreError>;
