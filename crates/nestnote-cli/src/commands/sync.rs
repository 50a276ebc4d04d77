//! Sync command handler

use anyhow::{bail, Result};
use serde_json::json;

use nestnote_core::Repository;

use super::{storage_failure, sync_failure};
use crate::output::{Output, OutputFormat};

/// Upload one note to Drive
///
/// Each run creates a new file on the remote side, even when the note was
/// uploaded before.
pub fn sync(repo: &mut Repository, title: String, output: &Output) -> Result<()> {
    let Some(content) = repo.load_note(&title).map_err(storage_failure)? else {
        bail!("Note not found: {}", title);
    };

    output.message(&format!("Uploading '{}'...", title));

    let remote_id = repo.sync_note(&title, &content).map_err(sync_failure)?;

    match output.format {
        OutputFormat::Json => {
            println!("{}", json!({"title": title, "remote_id": remote_id}));
        }
        OutputFormat::Quiet => println!("{}", remote_id),
        OutputFormat::Human => {
            output.success(&format!("Uploaded '{}' (remote id {})", title, remote_id))
        }
    }
    Ok(())
}
