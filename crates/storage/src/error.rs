//! Error types for state persistence.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while saving or loading a book snapshot.
///
/// Save errors are logged by the book and never reach submitters; load
/// errors make the book start empty.
#[derive(Debug, Error)]
pub enum StateError {
    /// No snapshot exists at the configured path.
    #[error("state file does not exist: {}", .0.display())]
    NotFound(PathBuf),

    /// Filesystem operation failed.
    #[error("failed to {op} state file {}: {source}", .path.display())]
    Io {
        /// What was being attempted.
        op: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Snapshot could not be serialized.
    #[error("failed to marshal state: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Snapshot bytes could not be parsed.
    #[error("failed to unmarshal state: {0}")]
    Deserialize(#[source] serde_json::Error),
}

impl StateError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StateError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Whether this is the "no snapshot yet" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StateError::NotFound(_))
    }
}
