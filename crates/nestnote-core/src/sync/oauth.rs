//! OAuth installed-app flow
//!
//! Client secrets come from a JSON file in the format issued by the
//! provider's console (`installed` or `web` key). Consent uses a loopback
//! redirect: a listener on `127.0.0.1` receives the authorization code
//! after the user approves access in the browser.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::credentials::{Authorizer, StoredToken, TokenResponse};
use super::error::{SyncError, SyncResult};

/// Scope that limits access to files this app creates
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// How long a loopback connection may sit silent before it is dropped
const LOOPBACK_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// OAuth client registration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parse a client secrets document
    pub fn from_json(json: &str) -> SyncResult<Self> {
        let file: ClientSecretsFile = serde_json::from_str(json)
            .map_err(|e| SyncError::AuthFailure(format!("invalid client secrets: {}", e)))?;

        file.installed.or(file.web).ok_or_else(|| {
            SyncError::AuthFailure("client secrets have no 'installed' or 'web' entry".to_string())
        })
    }

    /// Load client secrets from a file
    pub fn load(path: &Path) -> SyncResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            SyncError::AuthFailure(format!("cannot read client secrets {:?}: {}", path, e))
        })?;
        Self::from_json(&json)
    }
}

/// What the browser sent to the loopback listener
#[derive(Debug, PartialEq, Eq)]
enum Redirect {
    Code(String),
    Denied(String),
    StateMismatch,
    Unrelated,
}

/// Interpret the request target of a redirect
fn parse_redirect(target: &str, expected_state: &str) -> Redirect {
    let Ok(url) = Url::parse(&format!("http://127.0.0.1{}", target)) else {
        return Redirect::Unrelated;
    };

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Redirect::Denied(error);
    }
    match code {
        Some(_) if state.as_deref() != Some(expected_state) => Redirect::StateMismatch,
        Some(code) => Redirect::Code(code),
        None => Redirect::Unrelated,
    }
}

/// Network authorizer for the installed-app flow
pub struct OAuthAuthorizer {
    secrets_path: PathBuf,
    scopes: Vec<String>,
    http: Client,
}

impl OAuthAuthorizer {
    /// Create an authorizer reading client secrets from `secrets_path`
    ///
    /// The file is only read when a network step is needed.
    pub fn new(secrets_path: impl Into<PathBuf>) -> SyncResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("nestnote/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::AuthFailure(format!("cannot create HTTP client: {}", e)))?;

        Ok(Self {
            secrets_path: secrets_path.into(),
            scopes: vec![DRIVE_FILE_SCOPE.to_string()],
            http,
        })
    }

    /// Build the consent URL the user is sent to
    fn consent_url(
        &self,
        secrets: &ClientSecrets,
        redirect_uri: &str,
        state: &str,
    ) -> SyncResult<Url> {
        let scope = self.scopes.join(" ");
        Url::parse_with_params(
            &secrets.auth_uri,
            &[
                ("client_id", secrets.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .map_err(|e| SyncError::AuthFailure(format!("invalid auth_uri: {}", e)))
    }

    fn request_token(
        &self,
        secrets: &ClientSecrets,
        form: &[(&str, &str)],
    ) -> SyncResult<TokenResponse> {
        let response = self
            .http
            .post(&secrets.token_uri)
            .form(form)
            .send()
            .map_err(|e| SyncError::AuthFailure(format!("token endpoint unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SyncError::AuthFailure(format!(
                "token endpoint returned {}: {}",
                status,
                body.trim()
            )));
        }

        response
            .json::<TokenResponse>()
            .map_err(|e| SyncError::AuthFailure(format!("malformed token response: {}", e)))
    }

    /// Serve the loopback listener until the redirect arrives
    fn wait_for_code(&self, listener: &TcpListener, state: &str) -> SyncResult<String> {
        for stream in listener.incoming() {
            let mut stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Loopback connection failed: {}", e);
                    continue;
                }
            };

            // Browsers open speculative connections that never send a request
            if let Err(e) = stream.set_read_timeout(Some(LOOPBACK_READ_TIMEOUT)) {
                warn!("Cannot set loopback read timeout: {}", e);
                continue;
            }

            let target = match read_request_target(&stream) {
                Some(target) => target,
                None => continue,
            };
            debug!("Loopback request for {}", target);

            match parse_redirect(&target, state) {
                Redirect::Code(code) => {
                    respond(
                        &mut stream,
                        "200 OK",
                        "Authorization complete. You can close this window.",
                    );
                    return Ok(code);
                }
                Redirect::Denied(error) => {
                    respond(&mut stream, "200 OK", "Authorization was denied.");
                    return Err(SyncError::AuthFailure(format!("consent denied: {}", error)));
                }
                Redirect::StateMismatch => {
                    respond(&mut stream, "400 Bad Request", "Unexpected authorization response.");
                    return Err(SyncError::AuthFailure(
                        "authorization response had the wrong state".to_string(),
                    ));
                }
                Redirect::Unrelated => respond(&mut stream, "404 Not Found", "Not found."),
            }
        }

        Err(SyncError::AuthFailure(
            "loopback listener closed before authorization finished".to_string(),
        ))
    }
}

impl Authorizer for OAuthAuthorizer {
    fn refresh(&self, token: &StoredToken) -> SyncResult<StoredToken> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| SyncError::AuthFailure("no refresh token".to_string()))?;
        let secrets = ClientSecrets::load(&self.secrets_path)?;

        let response = self.request_token(
            &secrets,
            &[
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ],
        )?;

        info!("Refreshed access token");
        Ok(StoredToken::from_response(
            response,
            token.refresh_token.clone(),
            Utc::now(),
        ))
    }

    fn authorize(&self) -> SyncResult<StoredToken> {
        let secrets = ClientSecrets::load(&self.secrets_path)?;

        let listener = TcpListener::bind("127.0.0.1:0")
            .map_err(|e| SyncError::AuthFailure(format!("cannot start loopback listener: {}", e)))?;
        let port = listener
            .local_addr()
            .map_err(|e| SyncError::AuthFailure(e.to_string()))?
            .port();
        let redirect_uri = format!("http://127.0.0.1:{}/", port);
        let state = uuid::Uuid::new_v4().simple().to_string();

        let url = self.consent_url(&secrets, &redirect_uri, &state)?;
        eprintln!("Please visit this URL to authorize NestNote:\n{}", url);
        if let Err(e) = open::that(url.as_str()) {
            warn!("Could not open browser: {}", e);
        }

        let code = self.wait_for_code(&listener, &state)?;
        let response = self.request_token(
            &secrets,
            &[
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
                ("code", code.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ],
        )?;

        info!("Authorization granted");
        Ok(StoredToken::from_response(response, None, Utc::now()))
    }
}

/// Read the request line and return its target
fn read_request_target(stream: &TcpStream) -> Option<String> {
    let mut line = String::new();
    if let Err(e) = BufReader::new(stream).read_line(&mut line) {
        debug!("Dropping silent loopback connection: {}", e);
        return None;
    }
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => Some(target.to_string()),
        _ => None,
    }
}

fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let html = format!("<html><body><p>{}</p></body></html>", body);
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        html.len(),
        html
    );
    if let Err(e) = stream.write_all(response.as_bytes()) {
        debug!("Failed to answer loopback request: {}", e);
    }
}
