//! Backup snapshots
//!
//! A snapshot is a human-readable SQL dump in the style of `sqlite3 .dump`:
//!
//! ```text
//! -- nestnote snapshot v1
//! BEGIN TRANSACTION;
//! CREATE TABLE notes (...);
//! INSERT INTO "notes" VALUES(1,'Title','Title\nbody');
//! COMMIT;
//! ```
//!
//! Restoring never runs a dump against the live database. Statements are
//! split, checked against an allow-list, replayed into a scratch in-memory
//! database and the resulting notes are verified before anything is swapped.
//! A whole SQLite database file (such as another `notes.db`) can be restored
//! too; it is read without modification and verified the same way.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use super::error::{StorageError, StorageResult};
use super::schema::NOTES_TABLE_SQL;
use crate::models::{is_valid_title, Note};

/// First line of every snapshot this crate writes
pub const SNAPSHOT_HEADER: &str = "-- nestnote snapshot v1";

/// Leading bytes of every SQLite 3 database file
pub const SQLITE_HEADER: &[u8] = b"SQLite format 3\0";

/// Serialized, replayable capture of the whole note store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    text: String,
}

impl Snapshot {
    /// Wrap dump text read from disk; validation happens on restore
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Render a dump of `notes` in storage order
    pub fn capture(notes: &[Note]) -> Self {
        let content_len: usize = notes.iter().map(|n| n.content.len()).sum();
        let mut text = String::with_capacity(128 + content_len);
        text.push_str(SNAPSHOT_HEADER);
        text.push('\n');
        text.push_str("BEGIN TRANSACTION;\n");
        text.push_str(NOTES_TABLE_SQL);
        text.push_str(";\n");
        for note in notes {
            let _ = writeln!(
                text,
                "INSERT INTO \"notes\" VALUES({},{},{});",
                note.id,
                quote_text(&note.title),
                quote_text(&note.content)
            );
        }
        text.push_str("COMMIT;\n");
        Self { text }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Replay into a scratch database and return the verified notes
    ///
    /// The returned pairs are `(title, content)` in snapshot order.
    pub fn replay(&self) -> StorageResult<Vec<(String, String)>> {
        let statements = split_statements(&self.text)?;
        if statements.is_empty() {
            return Err(StorageError::corrupt("snapshot contains no statements"));
        }

        let scratch = Connection::open_in_memory()?;
        for (index, statement) in statements.iter().enumerate() {
            check_allowed(statement).map_err(|reason| {
                StorageError::corrupt(format!("statement {}: {}", index + 1, reason))
            })?;
            scratch.execute_batch(statement).map_err(|e| {
                StorageError::corrupt(format!("statement {} failed: {}", index + 1, e))
            })?;
        }
        debug!("Replayed {} snapshot statements", statements.len());

        let notes = read_notes(&scratch)?;
        verify_notes(&notes)?;
        Ok(notes)
    }
}

/// Read and verify the notes of a SQLite database file, opened read-only
pub fn read_database(path: &Path) -> StorageResult<Vec<(String, String)>> {
    let db = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| StorageError::corrupt(format!("cannot open database: {}", e)))?;
    let notes = read_notes(&db)?;
    verify_notes(&notes)?;
    debug!("Read {} notes from {:?}", notes.len(), path);
    Ok(notes)
}

/// SQL string literal for `value`
///
/// Text holding NUL characters is written as a hex blob cast to text so
/// the byte sequence survives the round trip.
fn quote_text(value: &str) -> String {
    if value.contains('\0') {
        let mut hex = String::with_capacity(value.len() * 2);
        for byte in value.as_bytes() {
            let _ = write!(hex, "{:02X}", byte);
        }
        format!("CAST(X'{}' AS TEXT)", hex)
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}

/// Split dump text into statements without their terminating `;`
///
/// Quotes (`'`, `"`, `` ` ``, `[...]`) and comments (`--`, `/* */`) are
/// honoured so semicolons inside note text do not end a statement.
fn split_statements(text: &str) -> StorageResult<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Normal,
        Quoted(char),
        LineComment,
        BlockComment,
    }

    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = State::Normal;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Normal => match c {
                ';' => {
                    let statement = current.trim();
                    if !statement.is_empty() {
                        statements.push(statement.to_string());
                    }
                    current.clear();
                }
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = State::BlockComment;
                }
                '\'' | '"' | '`' => {
                    current.push(c);
                    state = State::Quoted(c);
                }
                '[' => {
                    current.push(c);
                    state = State::Quoted(']');
                }
                _ => current.push(c),
            },
            State::Quoted(close) => {
                current.push(c);
                if c == close {
                    // A doubled quote is an escaped quote, not the end
                    if close != ']' && chars.peek() == Some(&close) {
                        current.push(close);
                        chars.next();
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if c == '\n' {
                    current.push('\n');
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    current.push(' ');
                    state = State::Normal;
                }
            }
        }
    }

    match state {
        State::Quoted(_) => return Err(StorageError::corrupt("unterminated quoted string")),
        State::BlockComment => return Err(StorageError::corrupt("unterminated comment")),
        State::Normal | State::LineComment => {}
    }

    let trailing = current.trim();
    if !trailing.is_empty() {
        statements.push(trailing.to_string());
    }

    Ok(statements)
}

/// Allow only the statement kinds a dump of the notes table contains
fn check_allowed(statement: &str) -> Result<(), String> {
    let words: Vec<String> = statement
        .split_whitespace()
        .take(3)
        .map(|w| w.to_ascii_uppercase())
        .collect();
    let first = words.first().map(String::as_str).unwrap_or("");
    let second = words.get(1).map(String::as_str).unwrap_or("");
    let third = words.get(2).map(String::as_str).unwrap_or("");

    let allowed = match first {
        "BEGIN" | "COMMIT" | "END" => true,
        "CREATE" => {
            matches!(second, "TABLE" | "INDEX") || (second == "UNIQUE" && third == "INDEX")
        }
        "INSERT" => second == "INTO" || second.starts_with("INTO"),
        "DELETE" => second == "FROM" && third.trim_matches('"') == "SQLITE_SEQUENCE",
        "PRAGMA" => second.starts_with("FOREIGN_KEYS"),
        _ => false,
    };

    if allowed {
        Ok(())
    } else {
        let preview: String = statement.chars().take(40).collect();
        Err(format!("unsupported statement '{}'", preview))
    }
}

/// Read every note in insertion order
fn read_notes(scratch: &Connection) -> StorageResult<Vec<(String, String)>> {
    let mut stmt = scratch
        .prepare("SELECT title, content FROM notes ORDER BY rowid")
        .map_err(|e| StorageError::corrupt(format!("no readable notes table: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, Option<String>>(1)?,
            ))
        })
        .map_err(|e| StorageError::corrupt(format!("cannot read notes: {}", e)))?;

    let mut notes = Vec::new();
    for row in rows {
        let (title, content) =
            row.map_err(|e| StorageError::corrupt(format!("malformed note row: {}", e)))?;
        let title = title.ok_or_else(|| StorageError::corrupt("note with NULL title"))?;
        notes.push((title, content.unwrap_or_default()));
    }
    Ok(notes)
}

fn verify_notes(notes: &[(String, String)]) -> StorageResult<()> {
    let mut seen = HashSet::with_capacity(notes.len());
    for (title, _) in notes {
        if !is_valid_title(title) {
            return Err(StorageError::corrupt("note with empty title"));
        }
        if !seen.insert(title.as_str()) {
            return Err(StorageError::corrupt(format!(
                "duplicate note title '{}'",
                title
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: i64, title: &str, content: &str) -> Note {
        Note {
            id,
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_capture_is_readable_sql() {
        let snapshot = Snapshot::capture(&[note(1, "Groceries", "Groceries\nmilk")]);
        let text = snapshot.as_str();

        assert!(text.starts_with(SNAPSHOT_HEADER));
        assert!(text.contains("BEGIN TRANSACTION;"));
        assert!(text.contains("CREATE TABLE notes"));
        assert!(text.contains("INSERT INTO \"notes\" VALUES(1,'Groceries','Groceries\nmilk');"));
        assert!(text.trim_end().ends_with("COMMIT;"));
    }

    #[test]
    fn test_replay_preserves_awkward_content() {
        let notes = vec![
            note(3, "It's; tricky", "It's; tricky\n-- not a comment\n/* nor this */"),
            note(7, "Quotes \"here\"", "Quotes \"here\"\n'single' ''double''"),
            note(9, "Nul", "Nul\0byte"),
            note(10, "Unicode ✓", "Unicode ✓\n日本語"),
        ];
        let replayed = Snapshot::capture(&notes).replay().unwrap();

        let expected: Vec<(String, String)> = notes
            .iter()
            .map(|n| (n.title.clone(), n.content.clone()))
            .collect();
        assert_eq!(replayed, expected);
    }

    #[test]
    fn test_replay_empty_store() {
        let replayed = Snapshot::capture(&[]).replay().unwrap();
        assert!(replayed.is_empty());
    }

    #[test]
    fn test_replay_accepts_plain_sqlite_dump() {
        // Shape produced by Python's Connection.iterdump() on the legacy table
        let dump = "BEGIN TRANSACTION;\n\
            CREATE TABLE notes (\n    id INTEGER PRIMARY KEY AUTOINCREMENT,\n    title TEXT UNIQUE,\n    content TEXT\n);\n\
            INSERT INTO \"notes\" VALUES(1,'First','First\nline');\n\
            INSERT INTO \"notes\" VALUES(2,'Second',NULL);\n\
            DELETE FROM \"sqlite_sequence\";\n\
            INSERT INTO \"sqlite_sequence\" VALUES('notes',2);\n\
            COMMIT;\n";

        let replayed = Snapshot::from_text(dump).replay().unwrap();
        assert_eq!(
            replayed,
            vec![
                ("First".to_string(), "First\nline".to_string()),
                ("Second".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_replay_rejects_garbage() {
        let err = Snapshot::from_text("this is not sql at all")
            .replay()
            .unwrap_err();
        assert!(matches!(err, StorageError::CorruptSnapshot { .. }));
    }

    #[test]
    fn test_replay_rejects_empty_text() {
        let err = Snapshot::from_text("-- only a comment\n").replay().unwrap_err();
        assert!(matches!(err, StorageError::CorruptSnapshot { .. }));
    }

    #[test]
    fn test_replay_rejects_attach() {
        let dump = "ATTACH DATABASE '/tmp/evil.db' AS evil;\nCREATE TABLE notes (id INTEGER, title TEXT, content TEXT);";
        let err = Snapshot::from_text(dump).replay().unwrap_err();
        assert!(err.to_string().contains("unsupported statement"));
    }

    #[test]
    fn test_replay_rejects_missing_table() {
        let err = Snapshot::from_text("BEGIN TRANSACTION;\nCREATE TABLE other (x TEXT);\nCOMMIT;")
            .replay()
            .unwrap_err();
        assert!(err.to_string().contains("notes table"));
    }

    #[test]
    fn test_replay_rejects_duplicate_titles() {
        let dump = "CREATE TABLE notes (id INTEGER PRIMARY KEY, title TEXT, content TEXT);\n\
            INSERT INTO notes VALUES(1,'Same','a');\n\
            INSERT INTO notes VALUES(2,'Same','b');";
        let err = Snapshot::from_text(dump).replay().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_replay_rejects_blank_title() {
        let dump = "CREATE TABLE notes (id INTEGER PRIMARY KEY, title TEXT, content TEXT);\n\
            INSERT INTO notes VALUES(1,'   ','body');";
        let err = Snapshot::from_text(dump).replay().unwrap_err();
        assert!(err.to_string().contains("empty title"));
    }

    #[test]
    fn test_replay_rejects_truncated_dump() {
        let full = Snapshot::capture(&[note(1, "Cut", "Cut here")]).into_text();
        let cut = &full[..full.find("Cut here").unwrap() + 3];
        let err = Snapshot::from_text(cut).replay().unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn test_split_statements_handles_comments_and_quotes() {
        let statements =
            split_statements("-- header\nBEGIN;\n/* a; b */ INSERT INTO t VALUES('x;y');\nCOMMIT")
                .unwrap();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0], "BEGIN");
        assert_eq!(statements[1], "INSERT INTO t VALUES('x;y')");
        assert_eq!(statements[2], "COMMIT");
    }

    #[test]
    fn test_check_allowed() {
        assert!(check_allowed("BEGIN TRANSACTION").is_ok());
        assert!(check_allowed("create unique index i on notes(title)").is_ok());
        assert!(check_allowed("INSERT INTO \"notes\" VALUES(1,'a','b')").is_ok());
        assert!(check_allowed("DELETE FROM \"sqlite_sequence\"").is_ok());
        assert!(check_allowed("PRAGMA foreign_keys=OFF").is_ok());

        assert!(check_allowed("DELETE FROM notes").is_err());
        assert!(check_allowed("PRAGMA writable_schema=ON").is_err());
        assert!(check_allowed("CREATE TRIGGER t AFTER INSERT ON notes BEGIN SELECT 1; END").is_err());
        assert!(check_allowed("SELECT * FROM notes").is_err());
    }
}
