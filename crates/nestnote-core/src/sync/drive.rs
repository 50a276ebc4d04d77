//! Upload client for the remote file store
//!
//! Uses a single multipart/related request: a JSON metadata part naming the
//! file, followed by the media part with the note's bytes.

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use super::error::{SyncError, SyncResult};
use crate::config::Config;
use crate::models::RemoteId;

/// Remote store that accepts staged note files
pub trait RemoteStore {
    /// Upload the file at `artifact` under `name` and return the new object's id
    ///
    /// Every call creates a new remote object.
    fn upload(&self, access_token: &str, name: &str, artifact: &Path) -> SyncResult<RemoteId>;
}

#[derive(Deserialize)]
struct UploadResponse {
    id: String,
}

/// Client for the Drive v3 multipart upload endpoint
pub struct DriveClient {
    http: Client,
    upload_url: String,
    mime_type: String,
}

impl DriveClient {
    pub fn new(upload_url: impl Into<String>, mime_type: impl Into<String>) -> SyncResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("nestnote/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                SyncError::TransportFailure(format!("cannot create HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            upload_url: upload_url.into(),
            mime_type: mime_type.into(),
        })
    }

    pub fn from_config(config: &Config) -> SyncResult<Self> {
        Self::new(config.upload_url.clone(), config.upload_mime_type.clone())
    }
}

impl RemoteStore for DriveClient {
    fn upload(&self, access_token: &str, name: &str, artifact: &Path) -> SyncResult<RemoteId> {
        let media = std::fs::read(artifact).map_err(|e| SyncError::staging(artifact, e))?;

        let metadata = serde_json::json!({ "name": name }).to_string();
        let boundary = format!("nestnote-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related(&boundary, &metadata, &self.mime_type, &media);

        debug!("Uploading {} bytes as {:?}", media.len(), name);
        let response = self
            .http
            .post(&self.upload_url)
            .bearer_auth(access_token)
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .map_err(|e| SyncError::TransportFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            let message = format!("server returned {}: {}", status, detail.trim());
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SyncError::AuthFailure(message),
                _ => SyncError::TransportFailure(message),
            });
        }

        let uploaded: UploadResponse = response
            .json()
            .map_err(|e| SyncError::TransportFailure(format!("malformed upload response: {}", e)))?;

        info!("Uploaded {:?} as {}", name, uploaded.id);
        Ok(RemoteId::new(uploaded.id))
    }
}

/// Assemble a multipart/related body with metadata and media parts
fn multipart_related(boundary: &str, metadata: &str, mime_type: &str, media: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(media.len() + metadata.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
