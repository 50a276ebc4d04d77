//! Temporary upload files
//!
//! A note is written to `<staging dir>/<title>.txt` before upload and the
//! file is removed when the `StagedArtifact` is dropped, whatever the
//! outcome of the upload.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::error::{SyncError, SyncResult};

/// Common file systems cap a name at 255 bytes; leave room for ".txt"
const MAX_NAME_BYTES: usize = 200;

/// A note's content written to disk for the duration of an upload
#[derive(Debug)]
pub struct StagedArtifact {
    path: PathBuf,
}

impl StagedArtifact {
    /// Write `content` to a file named after `title` inside `dir`
    pub fn stage(dir: &Path, title: &str, content: &str) -> SyncResult<Self> {
        std::fs::create_dir_all(dir).map_err(|e| SyncError::staging(dir, e))?;

        let path = dir.join(format!("{}.txt", file_stem(title)));
        std::fs::write(&path, content.as_bytes()).map_err(|e| SyncError::staging(&path, e))?;

        debug!("Staged note at {:?}", path);
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed staged file {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staged file {:?}: {}", self.path, e),
        }
    }
}

/// Make a title safe to use as a file name
///
/// The result never exceeds `MAX_NAME_BYTES` of UTF-8 and is cut on a
/// character boundary.
pub fn file_stem(title: &str) -> String {
    let mut cleaned = String::new();
    for c in title.trim().chars() {
        let c = match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        };
        if cleaned.len() + c.len_utf8() > MAX_NAME_BYTES {
            break;
        }
        cleaned.push(c);
    }

    if cleaned.is_empty() {
        "note".to_string()
    } else {
        cleaned
    }
}
