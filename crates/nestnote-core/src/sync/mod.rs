//! Note upload to remote storage
//!
//! Sync is one-way and on demand: a single note is pushed to the remote
//! file store as a new object. Nothing is downloaded or merged.
//!
//! ## Flow
//!
//! 1. Get an access token from the `CredentialProvider`
//! 2. Stage the note as a text file
//! 3. Upload it through the `RemoteStore`
//! 4. Remove the staged file
//!
//! ## Usage
//!
//! ```ignore
//! let mut sync = SyncCoordinator::from_config(&config)?;
//! let id = sync.sync_note("Plans", "Plans\nQ3 review")?;
//! ```

mod coordinator;
mod credentials;
mod drive;
mod error;
mod oauth;
mod staging;

pub use coordinator::{SyncCoordinator, SyncPhase};
pub use credentials::{
    Authorizer, CredentialProvider, FileCredentialProvider, StoredToken, TokenResponse,
};
pub use drive::{DriveClient, RemoteStore};
pub use error::{SyncError, SyncResult};
pub use oauth::{ClientSecrets, OAuthAuthorizer, DRIVE_FILE_SCOPE};
pub use staging::{file_stem, StagedArtifact};
