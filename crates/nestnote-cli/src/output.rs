//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde_json::json;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a note's full text
    pub fn print_note(&self, title: &str, content: &str) {
        match self.format {
            OutputFormat::Human | OutputFormat::Quiet => println!("{}", content),
            OutputFormat::Json => {
                println!("{}", json!({"title": title, "content": content}));
            }
        }
    }

    /// Print a list of note titles
    pub fn print_titles(&self, titles: &[String]) {
        match self.format {
            OutputFormat::Human => {
                if titles.is_empty() {
                    println!("No notes found.");
                    return;
                }
                for title in titles {
                    println!("{}", title);
                }
                println!("\n{} note(s)", titles.len());
            }
            OutputFormat::Json => {
                println!("{}", json!(titles));
            }
            OutputFormat::Quiet => {
                for title in titles {
                    println!("{}", title);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!("{}", json!({"status": "success", "message": message}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Truncate a string to `max_chars` characters, adding "..." if truncated
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// First line of the note body (the line after the title), truncated
pub fn body_preview(content: &str, max_chars: usize) -> String {
    let body = content.lines().nth(1).unwrap_or("");
    truncate(body.trim(), max_chars)
}
