//! Storage layer
//!
//! Handles the SQLite note table, backup snapshots and file persistence.
//!
//! ## Architecture
//!
//! - **engine**: `NoteStore`, the single-table title → content store
//! - **snapshot**: SQL dump format used by backup and restore
//! - **persistence**: atomic file writes shared by backups and the token cache

pub mod engine;
pub mod error;
pub mod persistence;
pub mod schema;
pub mod snapshot;

pub use engine::NoteStore;
pub use error::{StorageError, StorageResult};
pub use persistence::atomic_write;
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use snapshot::Snapshot;
