//! Sync coordinator
//!
//! Runs one note upload at a time: obtain credentials, stage the note,
//! upload it, clean up. Local notes are never touched.

use std::path::PathBuf;

use tracing::{info, warn};

use super::credentials::{CredentialProvider, FileCredentialProvider};
use super::drive::{DriveClient, RemoteStore};
use super::error::{SyncError, SyncResult};
use super::oauth::OAuthAuthorizer;
use super::staging::StagedArtifact;
use crate::config::Config;
use crate::models::{is_valid_title, RemoteId};

/// Where the most recent sync request got to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No sync has run yet
    Idle,
    /// Obtaining an access token
    Authenticating,
    /// Staging and uploading the note
    Uploading,
    /// Last sync succeeded
    Done,
    /// Last sync failed
    Failed,
}

/// Uploads single notes to the remote store
pub struct SyncCoordinator {
    credentials: Box<dyn CredentialProvider>,
    remote: Box<dyn RemoteStore>,
    staging_dir: PathBuf,
    phase: SyncPhase,
}

impl SyncCoordinator {
    pub fn new(
        credentials: Box<dyn CredentialProvider>,
        remote: Box<dyn RemoteStore>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            credentials,
            remote,
            staging_dir: staging_dir.into(),
            phase: SyncPhase::Idle,
        }
    }

    /// Coordinator using the OAuth token cache and Drive upload endpoint
    pub fn from_config(config: &Config) -> SyncResult<Self> {
        let authorizer = OAuthAuthorizer::new(config.credentials_path())?;
        let credentials = FileCredentialProvider::new(config.token_path(), authorizer);
        let remote = DriveClient::from_config(config)?;

        Ok(Self::new(
            Box::new(credentials),
            Box::new(remote),
            config.staging_dir(),
        ))
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Upload `content` as a new remote object named `title`
    ///
    /// Each call creates a separate remote object, even for a title that
    /// was synced before.
    pub fn sync_note(&mut self, title: &str, content: &str) -> SyncResult<RemoteId> {
        if !is_valid_title(title) {
            self.phase = SyncPhase::Failed;
            return Err(SyncError::EmptyTitle);
        }

        let result = self.run(title, content);
        match &result {
            Ok(id) => {
                info!("Synced {:?} as {}", title, id);
                self.phase = SyncPhase::Done;
            }
            Err(e) => {
                warn!("Sync of {:?} failed: {}", title, e);
                self.phase = SyncPhase::Failed;
            }
        }
        result
    }

    fn run(&mut self, title: &str, content: &str) -> SyncResult<RemoteId> {
        self.phase = SyncPhase::Authenticating;
        let token = self.credentials.access_token()?;

        self.phase = SyncPhase::Uploading;
        let artifact = StagedArtifact::stage(&self.staging_dir, title, content)?;
        self.remote.upload(&token, title, artifact.path())
    }
}
