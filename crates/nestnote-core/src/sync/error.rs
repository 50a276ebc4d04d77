//! Sync error handling

use std::io;
use std::path::Path;
use thiserror::Error;

/// Errors that can end a sync request
///
/// None of these change local notes. A failed sync is not retried; the
/// caller decides whether to try again.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Note title is empty or whitespace only
    #[error("Note title cannot be empty")]
    EmptyTitle,

    /// No usable credential for the remote service
    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    /// The upload did not complete, including local staging I/O
    #[error("Upload failed: {0}")]
    TransportFailure(String),
}

impl SyncError {
    /// A staging file could not be written or read back
    pub fn staging(path: &Path, source: io::Error) -> Self {
        SyncError::TransportFailure(format!("cannot stage note at {:?}: {}", path, source))
    }

    /// Whether re-authenticating could fix this
    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::AuthFailure(_))
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            SyncError::EmptyTitle => Some("Give the note a title on its first line."),
            SyncError::AuthFailure(_) => Some(
                "Check that the client secrets file exists. Delete the cached token to sign in again.",
            ),
            SyncError::TransportFailure(_) => Some(
                "Check your network connection and that the data directory is writable, then try again.",
            ),
        }
    }
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
