//! Repository facade
//!
//! `Repository` is the single entry point for a UI. It owns the note store
//! and the configuration, and builds the sync coordinator on first use so
//! commands that never sync do not touch the network stack.
//!
//! ## Usage
//!
//! ```ignore
//! let repo = Repository::open()?;
//!
//! let title = repo.save_note("Meeting Notes\nDiscuss budget")?;
//! let text = repo.load_note(&title)?;
//! let hits = repo.search_notes("budget")?;
//!
//! repo.backup_to(Path::new("notes.sql"))?;
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::Config;
use crate::models::{DeleteOutcome, Note, RemoteId};
use crate::search::SearchIndex;
use crate::storage::persistence::read_bytes;
use crate::storage::snapshot::SQLITE_HEADER;
use crate::storage::{atomic_write, NoteStore, Snapshot, StorageError, StorageResult};
use crate::sync::{SyncCoordinator, SyncPhase, SyncResult};

/// Note repository used by the UI
pub struct Repository {
    store: NoteStore,
    config: Config,
    sync: Option<SyncCoordinator>,
}

impl Repository {
    /// Open the repository described by the user's configuration
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config)
    }

    /// Open the repository with a specific configuration
    pub fn open_with_config(config: Config) -> Result<Self> {
        config
            .ensure_data_dir()
            .context("Failed to create data directory")?;
        let store = NoteStore::open(&config.notes_path())
            .with_context(|| format!("Failed to open {:?}", config.notes_path()))?;

        Ok(Self {
            store,
            config,
            sync: None,
        })
    }

    /// Use `sync` instead of the configured remote for `sync_note`
    pub fn with_sync_coordinator(mut self, sync: SyncCoordinator) -> Self {
        self.sync = Some(sync);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Save editor text as a note
    ///
    /// The first line becomes the title. A note with that title is replaced,
    /// otherwise a new note is created. Returns the title.
    pub fn save_note(&self, text: &str) -> StorageResult<String> {
        let note = Note::from_text(text);
        if !note.has_valid_title() {
            return Err(StorageError::EmptyTitle);
        }

        self.store.upsert(&note.title, &note.content)?;
        debug!("Saved note {:?}", note.title);
        Ok(note.title)
    }

    /// Delete the note with `title`, reporting whether it existed
    pub fn delete_note(&self, title: &str) -> StorageResult<DeleteOutcome> {
        self.store.delete(title)
    }

    /// Titles of every note in storage order
    pub fn list_notes(&self) -> StorageResult<Vec<String>> {
        self.store.list_titles()
    }

    /// Content of the note with `title`
    pub fn load_note(&self, title: &str) -> StorageResult<Option<String>> {
        self.store.get(title)
    }

    /// Titles of notes whose content contains `term`
    ///
    /// An empty term returns the full listing.
    pub fn search_notes(&self, term: &str) -> StorageResult<Vec<String>> {
        SearchIndex::new(&self.store).search(term)
    }

    /// Write a snapshot of every note to `path`
    pub fn backup_to(&self, path: &Path) -> StorageResult<()> {
        let snapshot = self.store.backup()?;
        atomic_write(path, snapshot.as_str().as_bytes())?;
        info!("Backed up notes to {:?}", path);
        Ok(())
    }

    /// Replace every note with the snapshot at `path`
    ///
    /// `path` may be an SQL dump written by `backup_to` or a SQLite
    /// database file such as another `notes.db`. The current notes survive
    /// any failure, including a snapshot that turns out to be corrupt.
    pub fn restore_from(&self, path: &Path) -> StorageResult<()> {
        let bytes = read_bytes(path)?;

        if bytes.starts_with(SQLITE_HEADER) {
            debug!("{:?} is a SQLite database", path);
            self.store.restore_database(path)?;
        } else {
            let text = String::from_utf8(bytes).map_err(|_| {
                StorageError::corrupt("snapshot is neither UTF-8 text nor a SQLite database")
            })?;
            self.store.restore(&Snapshot::from_text(text))?;
        }
        info!("Restored notes from {:?}", path);
        Ok(())
    }

    /// Upload a note to the remote store
    ///
    /// Local notes are not read or changed. Every call creates a new
    /// remote object.
    pub fn sync_note(&mut self, title: &str, content: &str) -> SyncResult<RemoteId> {
        let sync = match self.sync.take() {
            Some(sync) => sync,
            None => SyncCoordinator::from_config(&self.config)?,
        };
        self.sync.insert(sync).sync_note(title, content)
    }

    /// Phase of the most recent sync, `Idle` if none ran
    pub fn sync_phase(&self) -> SyncPhase {
        self.sync
            .as_ref()
            .map(SyncCoordinator::phase)
            .unwrap_or(SyncPhase::Idle)
    }

    /// Number of stored notes
    pub fn note_count(&self) -> StorageResult<i64> {
        self.store.note_count()
    }
}
