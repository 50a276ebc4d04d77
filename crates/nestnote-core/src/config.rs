//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/nestnote/config.toml)
//! 3. Environment variables (NESTNOTE_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix
const ENV_PREFIX: &str = "NESTNOTE";

/// Drive multipart upload endpoint
pub const DEFAULT_UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart&fields=id";

/// Mime type attached to uploaded notes
pub const DEFAULT_UPLOAD_MIME_TYPE: &str = "application/text";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for data storage (notes database, token cache, staging)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// OAuth client secrets file (defaults to `{data_dir}/credentials.json`)
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,

    /// Remote upload endpoint
    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    /// Mime type sent with each uploaded note
    #[serde(default = "default_upload_mime_type")]
    pub upload_mime_type: String,

    /// Log file path (defaults to `{data_dir}/debug.log`)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            credentials_file: None,
            upload_url: default_upload_url(),
            upload_mime_type: default_upload_mime_type(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (NESTNOTE_DATA_DIR, NESTNOTE_CREDENTIALS_FILE, NESTNOTE_UPLOAD_URL)
    /// 2. Config file (~/.config/nestnote/config.toml or NESTNOTE_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_path(p),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // Empty string clears it
        if let Ok(val) = std::env::var(format!("{}_CREDENTIALS_FILE", ENV_PREFIX)) {
            self.credentials_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        if let Ok(val) = std::env::var(format!("{}_UPLOAD_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.upload_url = val;
            }
        }
    }

    /// Ensure data directory exists
    pub fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with NESTNOTE_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nestnote")
            .join("config.toml")
    }

    /// Get the path to the SQLite notes database
    pub fn notes_path(&self) -> PathBuf {
        self.data_dir.join("notes.db")
    }

    /// Get the path to the cached OAuth token
    pub fn token_path(&self) -> PathBuf {
        self.data_dir.join("token.json")
    }

    /// Get the path to the OAuth client secrets
    pub fn credentials_path(&self) -> PathBuf {
        self.credentials_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("credentials.json"))
    }

    /// Get the directory where notes are staged before upload
    pub fn staging_dir(&self) -> PathBuf {
        self.data_dir.join("staging")
    }

    /// Get the log file path
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("debug.log"))
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nestnote")
}

fn default_upload_url() -> String {
    DEFAULT_UPLOAD_URL.to_string()
}

fn default_upload_mime_type() -> String {
    DEFAULT_UPLOAD_MIME_TYPE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "NESTNOTE_DATA_DIR",
        "NESTNOTE_CREDENTIALS_FILE",
        "NESTNOTE_UPLOAD_URL",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.credentials_file.is_none());
        assert_eq!(config.upload_url, DEFAULT_UPLOAD_URL);
        assert_eq!(config.upload_mime_type, "application/text");
        assert!(config.data_dir.ends_with("nestnote"));
    }

    #[test]
    fn test_file_paths() {
        let config = Config {
            data_dir: PathBuf::from("/data/nestnote"),
            ..Config::default()
        };

        assert_eq!(config.notes_path(), PathBuf::from("/data/nestnote/notes.db"));
        assert_eq!(config.token_path(), PathBuf::from("/data/nestnote/token.json"));
        assert_eq!(
            config.credentials_path(),
            PathBuf::from("/data/nestnote/credentials.json")
        );
        assert_eq!(config.staging_dir(), PathBuf::from("/data/nestnote/staging"));
        assert_eq!(config.log_path(), PathBuf::from("/data/nestnote/debug.log"));
    }

    #[test]
    fn test_explicit_credentials_file() {
        let config = Config {
            credentials_file: Some(PathBuf::from("/secrets/client.json")),
            ..Config::default()
        };
        assert_eq!(
            config.credentials_path(),
            PathBuf::from("/secrets/client.json")
        );
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("NESTNOTE_DATA_DIR", "/tmp/nestnote-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/nestnote-test"));
    }

    #[test]
    fn test_env_override_credentials_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("NESTNOTE_CREDENTIALS_FILE", "/tmp/creds.json");
        config.apply_env_overrides();
        assert_eq!(
            config.credentials_file,
            Some(PathBuf::from("/tmp/creds.json"))
        );

        env::set_var("NESTNOTE_CREDENTIALS_FILE", "");
        config.apply_env_overrides();
        assert!(config.credentials_file.is_none());
    }

    #[test]
    fn test_env_override_upload_url() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("NESTNOTE_UPLOAD_URL", "http://127.0.0.1:9000/upload");
        config.apply_env_overrides();
        assert_eq!(config.upload_url, "http://127.0.0.1:9000/upload");

        // Empty string keeps the current value
        env::set_var("NESTNOTE_UPLOAD_URL", "");
        config.apply_env_overrides();
        assert_eq!(config.upload_url, "http://127.0.0.1:9000/upload");
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            data_dir: PathBuf::from("/data/nestnote"),
            credentials_file: Some(PathBuf::from("/secrets/client.json")),
            log_file: None,
            ..Config::default()
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("credentials_file"));
        assert!(toml_str.contains("upload_url"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.data_dir, config.data_dir);
        assert_eq!(parsed.credentials_file, config.credentials_file);
        assert_eq!(parsed.upload_url, config.upload_url);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            upload_mime_type = "text/plain"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.upload_mime_type, "text/plain");
        assert_eq!(config.upload_url, DEFAULT_UPLOAD_URL);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        env::set_var("NESTNOTE_DATA_DIR", temp_dir.path().join("data"));

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert!(config.credentials_file.is_none());
        assert!(config.data_dir.exists());
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            upload_mime_type: "text/plain".to_string(),
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let reloaded = Config::load_from_path(&path).unwrap();
        assert_eq!(reloaded.data_dir, config.data_dir);
        assert_eq!(reloaded.upload_mime_type, "text/plain");
    }
}
