//! Data models for NestNote
//!
//! A note is identified by its title. The numeric `id` is the storage
//! ordinal and is never used as identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A title-identified text document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    /// Storage ordinal (auxiliary)
    pub id: i64,
    /// Note title, unique across the store
    pub title: String,
    /// Full note text; by convention its first line is the title
    pub content: String,
}

impl Note {
    /// Build a note from editor text
    ///
    /// The title is the first line (a trailing `\r` is dropped), the content
    /// is the whole text. The ordinal is assigned by storage.
    pub fn from_text(text: impl Into<String>) -> Self {
        let content = text.into();
        let title = title_of(&content).to_string();
        Self {
            id: 0,
            title,
            content,
        }
    }

    /// Whether the title is usable as an identity
    pub fn has_valid_title(&self) -> bool {
        is_valid_title(&self.title)
    }
}

/// First line of a note's text
pub fn title_of(text: &str) -> &str {
    let first = text.split('\n').next().unwrap_or("");
    first.strip_suffix('\r').unwrap_or(first)
}

/// A title is valid when it has non-whitespace characters
pub fn is_valid_title(title: &str) -> bool {
    !title.trim().is_empty()
}

/// Result of deleting a note by title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// The note existed and was removed
    Removed,
    /// No note had that title
    NotFound,
}

/// Identifier the remote store assigned to an uploaded note
///
/// Returned per push and never persisted locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_uses_first_line() {
        let note = Note::from_text("Meeting Notes\nDiscuss budget");
        assert_eq!(note.title, "Meeting Notes");
        assert_eq!(note.content, "Meeting Notes\nDiscuss budget");
        assert!(note.has_valid_title());
    }

    #[test]
    fn test_from_text_single_line() {
        let note = Note::from_text("Groceries");
        assert_eq!(note.title, "Groceries");
        assert_eq!(note.content, "Groceries");
    }

    #[test]
    fn test_from_text_crlf() {
        let note = Note::from_text("Windows title\r\nbody");
        assert_eq!(note.title, "Windows title");
        assert_eq!(note.content, "Windows title\r\nbody");
    }

    #[test]
    fn test_blank_first_line_is_invalid() {
        assert!(!Note::from_text("").has_valid_title());
        assert!(!Note::from_text("   \nbody below").has_valid_title());
        assert!(!is_valid_title("\t"));
        assert!(is_valid_title(" x "));
    }

    #[test]
    fn test_remote_id_display() {
        let id = RemoteId::new("1AbC");
        assert_eq!(id.to_string(), "1AbC");
        assert_eq!(id.as_str(), "1AbC");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"1AbC\"");
    }

    #[test]
    fn test_delete_outcome_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&DeleteOutcome::NotFound).unwrap(),
            "\"not_found\""
        );
    }
}
