//! NestNote CLI
//!
//! Command-line interface for NestNote - title-keyed personal notes.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use nestnote_core::{Config, Repository};

mod commands;
mod editor;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "nestnote")]
#[command(about = "NestNote - personal notes keyed by title")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use a specific config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a note; its first line is the title
    #[command(alias = "add")]
    Save {
        /// Note text, or "-" to read stdin (opens editor if omitted)
        text: Option<String>,
    },
    /// Edit an existing note in $EDITOR
    Edit {
        /// Note title
        title: String,
    },
    /// Print a note
    Show {
        /// Note title
        title: String,
    },
    /// List all note titles
    #[command(alias = "ls")]
    List,
    /// Find notes whose text contains a term (case-sensitive)
    Search {
        /// Text to look for; lists every note when omitted
        term: Option<String>,
    },
    /// Delete a note
    #[command(alias = "rm")]
    Delete {
        /// Note title
        title: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Write all notes to a snapshot file
    Backup {
        /// Destination file
        path: PathBuf,
    },
    /// Replace all notes with a snapshot file
    Restore {
        /// Snapshot file, or a SQLite notes database
        path: PathBuf,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Upload a note to Google Drive
    Sync {
        /// Note title
        title: String,
    },
    /// Show status (note count, storage, sign-in)
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, credentials_file, upload_url, upload_mime_type, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work without opening the note store
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, &output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let mut repo = Repository::open_with_config(config)?;

    match cli.command {
        Commands::Save { text } => commands::note::save(&repo, text, &output),
        Commands::Edit { title } => commands::note::edit(&repo, title, &output),
        Commands::Show { title } => commands::note::show(&repo, title, &output),
        Commands::List => commands::note::list(&repo, &output),
        Commands::Search { term } => commands::note::search(&repo, term, &output),
        Commands::Delete { title, yes } => commands::note::delete(&repo, title, yes, &output),
        Commands::Backup { path } => commands::backup::backup(&repo, path, &output),
        Commands::Restore { path, yes } => commands::backup::restore(&repo, path, yes, &output),
        Commands::Sync { title } => commands::sync::sync(&mut repo, title, &output),
        Commands::Status => commands::status::show(&repo, &output),
        Commands::Config { .. } => Ok(()), // Handled above
    }
}

/// Log to a file when NESTNOTE_LOG is set (e.g. NESTNOTE_LOG=debug)
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("NESTNOTE_LOG") else {
        return;
    };

    let log_path = config.log_path();
    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!("nestnote_core={0},nestnote={0}", log_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("Logging initialized to {:?}", log_path);
}
