//! Status command handler

use anyhow::Result;

use nestnote_core::Repository;

use super::storage_failure;
use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(repo: &Repository, output: &Output) -> Result<()> {
    let config = repo.config();
    let notes = repo.note_count().map_err(storage_failure)?;
    let notes_path = config.notes_path();
    let database_size = std::fs::metadata(&notes_path).map(|m| m.len()).unwrap_or(0);
    let credentials_path = config.credentials_path();
    let token_path = config.token_path();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "notes": notes,
                    "storage": {
                        "data_dir": config.data_dir,
                        "database": notes_path,
                        "database_size": database_size
                    },
                    "sync": {
                        "upload_url": config.upload_url,
                        "credentials_file": credentials_path,
                        "credentials_present": credentials_path.exists(),
                        "signed_in": token_path.exists()
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", notes);
        }
        OutputFormat::Human => {
            println!("NestNote Status");
            println!("===============");
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            println!("  Size:     {}", human_size(database_size));
            println!("  Notes:    {}", notes);
            println!();
            println!("Sync:");
            println!("  Upload URL:  {}", config.upload_url);
            println!(
                "  Credentials: {}{}",
                credentials_path.display(),
                if credentials_path.exists() {
                    ""
                } else {
                    " (missing)"
                }
            );
            println!(
                "  Signed in:   {}",
                if token_path.exists() { "yes" } else { "no" }
            );
        }
    }

    Ok(())
}

/// Format a byte count for humans
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
