//! Command handlers

pub mod backup;
pub mod config;
pub mod note;
pub mod status;
pub mod sync;

use nestnote_core::{StorageError, SyncError};

/// Attach the recovery hint to a storage error
pub fn storage_failure(err: StorageError) -> anyhow::Error {
    match err.recovery_suggestion() {
        Some(hint) => anyhow::anyhow!("{}\n  {}", err, hint),
        None => err.into(),
    }
}

/// Attach the recovery hint to a sync error
pub fn sync_failure(err: SyncError) -> anyhow::Error {
    match err.recovery_suggestion() {
        Some(hint) => anyhow::anyhow!("{}\n  {}", err, hint),
        None => err.into(),
    }
}
