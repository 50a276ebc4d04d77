//! Credential cache for the remote service
//!
//! `FileCredentialProvider` keeps the current token in memory and mirrors it
//! to a JSON file. On each request it:
//! 1. loads the file if nothing is cached yet
//! 2. returns the cached token while it is valid
//! 3. refreshes an expired token that carries a refresh token
//! 4. otherwise asks the `Authorizer` for interactive consent
//!
//! Any new token is written back to the file. The provider never discards a
//! working token on its own; only revocation on the server side ends it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::{SyncError, SyncResult};
use crate::storage::atomic_write;

/// Tokens this close to expiry are treated as expired
const EXPIRY_SKEW_SECS: i64 = 60;

/// Source of bearer tokens for uploads
pub trait CredentialProvider {
    /// Return a currently valid access token, authenticating if needed
    fn access_token(&mut self) -> SyncResult<String>;
}

/// Performs the network side of authentication
pub trait Authorizer {
    /// Exchange the token's refresh token for a new access token
    fn refresh(&self, token: &StoredToken) -> SyncResult<StoredToken>;

    /// Obtain a new token through user consent
    fn authorize(&self) -> SyncResult<StoredToken>;
}

/// Token as cached on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Body returned by an OAuth token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl StoredToken {
    /// Build a cached token from an endpoint response
    ///
    /// Refresh responses usually omit the refresh token; the previous one
    /// is carried over in that case.
    pub fn from_response(
        response: TokenResponse,
        previous_refresh: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh),
            expires_at: response.expires_in.map(|secs| now + Duration::seconds(secs)),
            scopes: response
                .scope
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            token_type: response.token_type.unwrap_or_else(default_token_type),
        }
    }

    /// Whether the token can be used at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_empty() {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => now + Duration::seconds(EXPIRY_SKEW_SECS) < expires_at,
            None => true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Whether a refresh can be attempted
    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|t| !t.is_empty())
    }
}

/// File-backed credential provider
pub struct FileCredentialProvider<A: Authorizer> {
    path: PathBuf,
    authorizer: A,
    cached: Option<StoredToken>,
}

impl<A: Authorizer> FileCredentialProvider<A> {
    pub fn new(path: impl Into<PathBuf>, authorizer: A) -> Self {
        Self {
            path: path.into(),
            authorizer,
            cached: None,
        }
    }

    /// Path of the token cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Token currently held in memory
    pub fn cached(&self) -> Option<&StoredToken> {
        self.cached.as_ref()
    }

    /// Read the cache file, ignoring a missing or unreadable one
    fn load(&self) -> Option<StoredToken> {
        if !self.path.exists() {
            return None;
        }

        let parsed = std::fs::read_to_string(&self.path)
            .map_err(|e| e.to_string())
            .and_then(|json| serde_json::from_str(&json).map_err(|e| e.to_string()));

        match parsed {
            Ok(token) => {
                debug!("Loaded cached token from {:?}", self.path);
                Some(token)
            }
            Err(e) => {
                warn!("Ignoring unreadable token cache {:?}: {}", self.path, e);
                None
            }
        }
    }

    /// Write the token to the cache file
    ///
    /// A failed write keeps the in-memory token usable; the next process
    /// will simply authenticate again.
    fn store(&self, token: &StoredToken) {
        let json = match serde_json::to_vec_pretty(token) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize token: {}", e);
                return;
            }
        };

        if let Err(e) = atomic_write(&self.path, &json) {
            warn!("Failed to write token cache {:?}: {}", self.path, e);
            return;
        }
        restrict_permissions(&self.path);
    }

    fn obtain(&self, current: Option<StoredToken>) -> SyncResult<StoredToken> {
        if let Some(token) = current.filter(StoredToken::can_refresh) {
            debug!("Refreshing expired token");
            match self.authorizer.refresh(&token) {
                Ok(refreshed) => return Ok(refreshed),
                Err(e) => warn!("Token refresh failed, asking for consent: {}", e),
            }
        }

        info!("Requesting authorization from user");
        self.authorizer.authorize()
    }
}

impl<A: Authorizer> CredentialProvider for FileCredentialProvider<A> {
    fn access_token(&mut self) -> SyncResult<String> {
        if self.cached.is_none() {
            self.cached = self.load();
        }

        if let Some(token) = self.cached.as_ref().filter(|t| t.is_valid()) {
            return Ok(token.access_token.clone());
        }

        let token = self.obtain(self.cached.clone())?;
        if token.access_token.is_empty() {
            return Err(SyncError::AuthFailure(
                "authorization returned an empty access token".to_string(),
            ));
        }

        self.store(&token);
        let access_token = token.access_token.clone();
        self.cached = Some(token);
        Ok(access_token)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
        warn!("Failed to restrict permissions on {:?}: {}", path, e);
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Calls {
        refresh: Cell<u32>,
        authorize: Cell<u32>,
    }

    /// Authorizer that hands out numbered tokens
    struct FakeAuthorizer {
        calls: Rc<Calls>,
        refresh_fails: bool,
    }

    impl FakeAuthorizer {
        fn new(calls: Rc<Calls>) -> Self {
            Self {
                calls,
                refresh_fails: false,
            }
        }
    }

    impl Authorizer for FakeAuthorizer {
        fn refresh(&self, token: &StoredToken) -> SyncResult<StoredToken> {
            self.calls.refresh.set(self.calls.refresh.get() + 1);
            if self.refresh_fails {
                return Err(SyncError::AuthFailure("revoked".into()));
            }
            Ok(StoredToken {
                access_token: format!("refreshed-{}", self.calls.refresh.get()),
                refresh_token: token.refresh_token.clone(),
                expires_at: Some(Utc::now() + Duration::hours(1)),
                scopes: token.scopes.clone(),
                token_type: default_token_type(),
            })
        }

        fn authorize(&self) -> SyncResult<StoredToken> {
            self.calls.authorize.set(self.calls.authorize.get() + 1);
            Ok(StoredToken {
                access_token: format!("consented-{}", self.calls.authorize.get()),
                refresh_token: Some("refresh".into()),
                expires_at: Some(Utc::now() + Duration::hours(1)),
                scopes: vec!["drive.file".into()],
                token_type: default_token_type(),
            })
        }
    }

    fn token(access: &str, refresh: Option<&str>, expires_in: Duration) -> StoredToken {
        StoredToken {
            access_token: access.to_string(),
            refresh_token: refresh.map(str::to_string),
            expires_at: Some(Utc::now() + expires_in),
            scopes: Vec::new(),
            token_type: default_token_type(),
        }
    }

    fn write_token(path: &Path, token: &StoredToken) {
        std::fs::write(path, serde_json::to_string(token).unwrap()).unwrap();
    }

    #[test]
    fn test_token_validity_window() {
        let now = Utc::now();
        let mut t = token("a", None, Duration::hours(1));
        assert!(t.is_valid_at(now));

        t.expires_at = Some(now + Duration::seconds(30));
        assert!(!t.is_valid_at(now));

        t.expires_at = None;
        assert!(t.is_valid_at(now));

        t.access_token.clear();
        assert!(!t.is_valid_at(now));
    }

    #[test]
    fn test_from_response_keeps_previous_refresh_token() {
        let now = Utc::now();
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"new","expires_in":3599,"scope":"a b","token_type":"Bearer"}"#,
        )
        .unwrap();

        let t = StoredToken::from_response(response, Some("old-refresh".into()), now);
        assert_eq!(t.access_token, "new");
        assert_eq!(t.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(t.expires_at, Some(now + Duration::seconds(3599)));
        assert_eq!(t.scopes, vec!["a", "b"]);
    }

    #[test]
    fn test_first_use_runs_consent_and_writes_cache() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token.json");
        let calls = Rc::new(Calls::default());
        let mut provider = FileCredentialProvider::new(&path, FakeAuthorizer::new(calls.clone()));

        assert_eq!(provider.access_token().unwrap(), "consented-1");
        assert_eq!(calls.authorize.get(), 1);
        assert!(path.exists());

        let on_disk: StoredToken =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.access_token, "consented-1");
    }

    #[test]
    fn test_cached_token_is_reused() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token.json");
        let calls = Rc::new(Calls::default());
        let mut provider = FileCredentialProvider::new(&path, FakeAuthorizer::new(calls.clone()));

        provider.access_token().unwrap();
        provider.access_token().unwrap();

        assert_eq!(calls.authorize.get(), 1);
        assert_eq!(calls.refresh.get(), 0);
    }

    #[test]
    fn test_valid_file_token_needs_no_network() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token.json");
        write_token(&path, &token("from-disk", Some("r"), Duration::hours(1)));

        let calls = Rc::new(Calls::default());
        let mut provider = FileCredentialProvider::new(&path, FakeAuthorizer::new(calls.clone()));

        assert_eq!(provider.access_token().unwrap(), "from-disk");
        assert_eq!(calls.refresh.get(), 0);
        assert_eq!(calls.authorize.get(), 0);
    }

    #[test]
    fn test_expired_token_is_refreshed_and_rewritten() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token.json");
        write_token(&path, &token("stale", Some("r"), -Duration::hours(1)));

        let calls = Rc::new(Calls::default());
        let mut provider = FileCredentialProvider::new(&path, FakeAuthorizer::new(calls.clone()));

        assert_eq!(provider.access_token().unwrap(), "refreshed-1");
        assert_eq!(calls.refresh.get(), 1);
        assert_eq!(calls.authorize.get(), 0);

        let on_disk: StoredToken =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.access_token, "refreshed-1");
        assert_eq!(on_disk.refresh_token.as_deref(), Some("r"));
    }

    #[test]
    fn test_expired_without_refresh_token_runs_consent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token.json");
        write_token(&path, &token("stale", None, -Duration::hours(1)));

        let calls = Rc::new(Calls::default());
        let mut provider = FileCredentialProvider::new(&path, FakeAuthorizer::new(calls.clone()));

        assert_eq!(provider.access_token().unwrap(), "consented-1");
        assert_eq!(calls.refresh.get(), 0);
    }

    #[test]
    fn test_failed_refresh_falls_back_to_consent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token.json");
        write_token(&path, &token("stale", Some("revoked"), -Duration::hours(1)));

        let calls = Rc::new(Calls::default());
        let mut authorizer = FakeAuthorizer::new(calls.clone());
        authorizer.refresh_fails = true;
        let mut provider = FileCredentialProvider::new(&path, authorizer);

        assert_eq!(provider.access_token().unwrap(), "consented-1");
        assert_eq!(calls.refresh.get(), 1);
        assert_eq!(calls.authorize.get(), 1);
    }

    #[test]
    fn test_corrupt_cache_file_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();

        let calls = Rc::new(Calls::default());
        let mut provider = FileCredentialProvider::new(&path, FakeAuthorizer::new(calls.clone()));

        assert_eq!(provider.access_token().unwrap(), "consented-1");
        assert!(provider.cached().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_cache_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token.json");
        let calls = Rc::new(Calls::default());
        let mut provider = FileCredentialProvider::new(&path, FakeAuthorizer::new(calls));
        provider.access_token().unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
