//! Backup and restore command handlers

use std::path::PathBuf;

use anyhow::Result;
use serde_json::json;

use nestnote_core::Repository;

use super::storage_failure;
use crate::editor::confirm;
use crate::output::{Output, OutputFormat};

/// Write every note to a snapshot file
pub fn backup(repo: &Repository, path: PathBuf, output: &Output) -> Result<()> {
    repo.backup_to(&path).map_err(storage_failure)?;
    let count = repo.note_count().map_err(storage_failure)?;

    match output.format {
        OutputFormat::Json => {
            println!("{}", json!({"status": "success", "path": path, "notes": count}));
        }
        _ => output.success(&format!(
            "Backed up {} note(s) to {}",
            count,
            path.display()
        )),
    }
    Ok(())
}

/// Replace every note with the contents of a snapshot or database file
pub fn restore(repo: &Repository, path: PathBuf, yes: bool, output: &Output) -> Result<()> {
    if output.should_prompt() && !yes {
        let count = repo.note_count().map_err(storage_failure)?;
        println!(
            "Restoring from {} replaces all {} current note(s).",
            path.display(),
            count
        );
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    repo.restore_from(&path).map_err(storage_failure)?;
    let count = repo.note_count().map_err(storage_failure)?;

    match output.format {
        OutputFormat::Json => {
            println!("{}", json!({"status": "success", "path": path, "notes": count}));
        }
        _ => output.success(&format!(
            "Restored {} note(s) from {}",
            count,
            path.display()
        )),
    }
    Ok(())
}
