//! Note command handlers
//!
//! A note's first line is its title; saving text whose title already
//! exists replaces that note.

use anyhow::{bail, Context, Result};
use serde_json::json;

use nestnote_core::{DeleteOutcome, Repository};

use super::storage_failure;
use crate::editor::{confirm, edit_text, read_stdin};
use crate::output::{body_preview, Output, OutputFormat};

/// Save a note from an argument, stdin (`-`) or the editor
pub fn save(repo: &Repository, text: Option<String>, output: &Output) -> Result<()> {
    let text = match text {
        Some(t) if t == "-" => read_stdin()?,
        Some(t) => t,
        None => {
            let edited = edit_text("").context("Failed to edit note")?;
            if edited.trim().is_empty() {
                output.message("Empty note, nothing saved.");
                return Ok(());
            }
            edited
        }
    };

    let title = repo.save_note(&text).map_err(storage_failure)?;

    match output.format {
        OutputFormat::Quiet => println!("{}", title),
        _ => output.success(&format!("Saved note: {}", title)),
    }
    Ok(())
}

/// Edit an existing note in the editor and save the result
///
/// Changing the first line saves under the new title and leaves the old
/// note in place.
pub fn edit(repo: &Repository, title: String, output: &Output) -> Result<()> {
    let Some(content) = repo.load_note(&title).map_err(storage_failure)? else {
        bail!("Note not found: {}", title);
    };

    let edited = edit_text(&content).context("Failed to edit note")?;
    if edited == content {
        output.message("No changes.");
        return Ok(());
    }

    let saved = repo.save_note(&edited).map_err(storage_failure)?;
    if saved != title {
        output.message(&format!(
            "Title changed; '{}' was saved as a new note and '{}' is unchanged.",
            saved, title
        ));
    }
    output.success(&format!("Saved note: {}", saved));
    Ok(())
}

/// Print a note's text
pub fn show(repo: &Repository, title: String, output: &Output) -> Result<()> {
    match repo.load_note(&title).map_err(storage_failure)? {
        Some(content) => {
            output.print_note(&title, &content);
            Ok(())
        }
        None => bail!("Note not found: {}", title),
    }
}

/// List all note titles
pub fn list(repo: &Repository, output: &Output) -> Result<()> {
    let titles = repo.list_notes().map_err(storage_failure)?;
    output.print_titles(&titles);
    Ok(())
}

/// Search note content for a term
///
/// Without a term every note is listed.
pub fn search(repo: &Repository, term: Option<String>, output: &Output) -> Result<()> {
    let term = term.unwrap_or_default();
    let titles = repo.search_notes(&term).map_err(storage_failure)?;

    if titles.is_empty() && output.format == OutputFormat::Human {
        println!("No notes contain '{}'.", term);
        return Ok(());
    }
    output.print_titles(&titles);
    Ok(())
}

/// Delete a note by title
pub fn delete(repo: &Repository, title: String, yes: bool, output: &Output) -> Result<()> {
    let Some(content) = repo.load_note(&title).map_err(storage_failure)? else {
        return report_delete(&title, DeleteOutcome::NotFound, output);
    };

    if output.should_prompt() && !yes {
        let preview = body_preview(&content, 50);
        if preview.is_empty() {
            println!("Delete note: {}", title);
        } else {
            println!("Delete note: {} - {}", title, preview);
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let outcome = repo.delete_note(&title).map_err(storage_failure)?;
    report_delete(&title, outcome, output)
}

fn report_delete(title: &str, outcome: DeleteOutcome, output: &Output) -> Result<()> {
    match (output.format, outcome) {
        (OutputFormat::Json, _) => {
            println!("{}", json!({"title": title, "outcome": outcome}));
        }
        (_, DeleteOutcome::Removed) => output.success(&format!("Deleted note: {}", title)),
        (_, DeleteOutcome::NotFound) => output.message(&format!("No note titled '{}'.", title)),
    }
    Ok(())
}
