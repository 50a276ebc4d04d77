//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use nestnote_core::Config;

use crate::output::{Output, OutputFormat};

const KEYS: &str = "data_dir, credentials_file, upload_url, upload_mime_type, log_file";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "credentials_file": config.credentials_path(),
                    "upload_url": config.upload_url,
                    "upload_mime_type": config.upload_mime_type,
                    "log_file": config.log_path()
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:         {}", config.data_dir.display());
            println!(
                "  credentials_file: {}",
                config.credentials_path().display()
            );
            println!("  upload_url:       {}", config.upload_url);
            println!("  upload_mime_type: {}", config.upload_mime_type);
            println!("  log_file:         {}", config.log_path().display());
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

/// Update one field; empty or "none" resets optional paths
fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let optional_path = || {
        if value.is_empty() || value == "none" {
            None
        } else {
            Some(PathBuf::from(value))
        }
    };

    match key {
        "data_dir" => {
            if value.is_empty() {
                bail!("data_dir cannot be empty");
            }
            config.data_dir = value.into();
        }
        "credentials_file" => config.credentials_file = optional_path(),
        "log_file" => config.log_file = optional_path(),
        "upload_url" => {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                bail!("upload_url must be an http:// or https:// URL");
            }
            config.upload_url = value.to_string();
        }
        "upload_mime_type" => {
            if !value.contains('/') {
                bail!("upload_mime_type must look like 'type/subtype'");
            }
            config.upload_mime_type = value.to_string();
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                KEYS
            );
        }
    }
    Ok(())
}
