//! SQLite note store
//!
//! One connection per store, guarded by a mutex. Every operation takes the
//! lock for its whole duration, so callers observe operations in the order
//! they were issued and restore can swap the table without interleaving.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::{debug, info};

use super::error::{StorageError, StorageResult};
use super::persistence::ensure_parent_dir;
use super::schema::{drop_schema, init_schema, needs_init};
use super::snapshot::{read_database, Snapshot};
use crate::models::{is_valid_title, DeleteOutcome, Note};

/// Title-keyed note storage
pub struct NoteStore {
    conn: Mutex<Connection>,
}

impl NoteStore {
    /// Open or create the notes database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        ensure_parent_dir(path)?;

        let conn = Connection::open(path)?;
        if needs_init(&conn) {
            init_schema(&conn)?;
        }
        debug!("Opened note store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Insert a note, or replace the content of the note with this title
    ///
    /// The ordinal of an existing note is kept, so its position in
    /// `list_titles` does not change.
    pub fn upsert(&self, title: &str, content: &str) -> StorageResult<()> {
        if !is_valid_title(title) {
            return Err(StorageError::EmptyTitle);
        }

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO notes (title, content) VALUES (?1, ?2)
             ON CONFLICT(title) DO UPDATE SET content = excluded.content",
            params![title, content],
        )?;
        debug!("Saved note {:?}", title);
        Ok(())
    }

    /// Current content of the note with this title
    pub fn get(&self, title: &str) -> StorageResult<Option<String>> {
        let conn = self.lock()?;
        let content = conn
            .query_row(
                "SELECT content FROM notes WHERE title = ?1",
                params![title],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        // Tables from the desktop app allowed NULL content
        Ok(content.map(Option::unwrap_or_default))
    }

    /// Remove the note with this title
    pub fn delete(&self, title: &str) -> StorageResult<DeleteOutcome> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM notes WHERE title = ?1", params![title])?;

        if rows == 0 {
            debug!("Delete of {:?} found nothing", title);
            Ok(DeleteOutcome::NotFound)
        } else {
            debug!("Deleted note {:?}", title);
            Ok(DeleteOutcome::Removed)
        }
    }

    /// All titles in storage order
    pub fn list_titles(&self) -> StorageResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT title FROM notes ORDER BY id")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(titles)
    }

    /// All notes with content, in storage order
    pub fn entries(&self) -> StorageResult<Vec<Note>> {
        let conn = self.lock()?;
        read_all(&conn)
    }

    /// Number of stored notes
    pub fn note_count(&self) -> StorageResult<i64> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
            .map_err(Into::into)
    }

    /// Destroy every note and recreate the empty schema
    pub fn reset(&self) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        reset_in(&tx)?;
        tx.commit()?;
        info!("Note store reset");
        Ok(())
    }

    /// Capture every note as a point-in-time snapshot
    ///
    /// Rows are read inside one transaction while the store lock is held, so
    /// no write can land halfway through the dump.
    pub fn backup(&self) -> StorageResult<Snapshot> {
        let notes = {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            let notes = read_all(&tx)?;
            tx.commit()?;
            notes
        };

        debug!("Captured snapshot of {} notes", notes.len());
        Ok(Snapshot::capture(&notes))
    }

    /// Replace the whole store with the contents of `snapshot`
    ///
    /// The snapshot is replayed and verified in a scratch database first.
    /// Only then is the live table dropped and refilled, inside a single
    /// transaction. On any error the current notes are left as they were.
    pub fn restore(&self, snapshot: &Snapshot) -> StorageResult<()> {
        let notes = snapshot.replay()?;
        self.replace_all(&notes)?;
        info!("Restored {} notes from snapshot", notes.len());
        Ok(())
    }

    /// Replace the whole store with the notes of another SQLite database
    ///
    /// `path` is opened read-only and its notes are verified the same way
    /// as a replayed snapshot before the live table is touched.
    pub fn restore_database(&self, path: &Path) -> StorageResult<()> {
        let notes = read_database(path)?;
        self.replace_all(&notes)?;
        info!("Restored {} notes from database {:?}", notes.len(), path);
        Ok(())
    }

    fn replace_all(&self, notes: &[(String, String)]) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        reset_in(&tx)?;
        {
            let mut insert = tx.prepare("INSERT INTO notes (title, content) VALUES (?1, ?2)")?;
            for (title, content) in notes {
                insert.execute(params![title, content])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

/// Drop and recreate the schema; committed only with `tx`
fn reset_in(tx: &Transaction) -> StorageResult<()> {
    drop_schema(tx)?;
    init_schema(tx)?;
    Ok(())
}

fn read_all(conn: &Connection) -> StorageResult<Vec<Note>> {
    let mut stmt = conn.prepare("SELECT id, title, content FROM notes ORDER BY id")?;
    let notes = stmt
        .query_map([], |row| {
            Ok(Note {
                id: row.get(0)?,
                title: row.get(1)?,
                content: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(notes)
}
