//! NestNote Core Library
//!
//! This crate provides the core functionality for NestNote, a personal note
//! repository where every note is identified by its title (the first line
//! of its text).
//!
//! # Architecture
//!
//! - **SQLite**: a single `notes` table is the source of truth
//! - **Snapshots**: SQL dumps used for backup and verified restore
//! - **Drive**: one-way, on-demand upload of single notes
//!
//! # Quick Start
//!
//! ```text
//! let repo = Repository::open()?;
//!
//! // Save a note; the first line is its title
//! let title = repo.save_note("Meeting Notes\nDiscuss budget")?;
//!
//! // Query notes
//! let titles = repo.list_notes()?;
//! let hits = repo.search_notes("budget")?;
//! ```
//!
//! # Modules
//!
//! - `repository`: Facade used by user interfaces (main entry point)
//! - `models`: Note, title rules and operation outcomes
//! - `storage`: SQLite note store, snapshots and file helpers
//! - `search`: Substring search over note content
//! - `sync`: Credential handling and Drive upload
//! - `config`: Application configuration

pub mod config;
pub mod models;
pub mod repository;
pub mod search;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use models::{DeleteOutcome, Note, RemoteId};
pub use repository::Repository;
pub use search::SearchIndex;
pub use storage::{NoteStore, Snapshot, StorageError};
pub use sync::{SyncCoordinator, SyncError, SyncPhase};
