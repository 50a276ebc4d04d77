//! File persistence helpers
//!
//! Backups and the credential cache are written with atomic writes (write to
//! a temp file, then rename) so a crash never leaves a half-written file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::error::{StorageError, StorageResult};

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
pub fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    ensure_parent_dir(path)?;

    let temp_path = temp_path_for(path);

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| {
        let _ = fs::remove_file(&temp_path);
        StorageError::AtomicWriteFailed {
            from: temp_path.clone(),
            to: path.to_path_buf(),
            source,
        }
    })?;

    Ok(())
}

/// Read a whole file, classifying failures by path
pub fn read_bytes(path: &Path) -> StorageResult<Vec<u8>> {
    fs::read(path).map_err(|e| StorageError::from_read(e, path.to_path_buf()))
}

/// Create the parent directory of `path` if it is missing
pub fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}

/// Sibling temp file: `notes.sql` -> `notes.sql.tmp`
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a").join("b").join("backup.sql");

        atomic_write(&path, b"hello").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_atomic_write_replaces_existing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token.json");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_temp_path_keeps_extension() {
        let path = Path::new("/data/backup.sql");
        assert_eq!(temp_path_for(path), PathBuf::from("/data/backup.sql.tmp"));
    }

    #[test]
    fn test_read_bytes_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = read_bytes(&temp_dir.path().join("missing.sql")).unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }
}
