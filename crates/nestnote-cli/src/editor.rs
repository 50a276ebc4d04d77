//! Interactive input
//!
//! Opens the user's editor on a private temporary file, reads piped text
//! and asks for confirmation before destructive commands.

use std::env;
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::debug;

const FALLBACK_EDITORS: [&str; 5] = ["nano", "vim", "vi", "emacs", "notepad"];

/// An editor program plus the arguments it was configured with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorCommand {
    program: String,
    args: Vec<String>,
}

impl EditorCommand {
    /// Parse a setting such as `vim` or `code --wait`
    pub fn parse(setting: &str) -> Option<Self> {
        let mut words = setting.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }

    /// $VISUAL, then $EDITOR, then the first common editor on PATH
    pub fn detect() -> Result<Self> {
        let configured = ["VISUAL", "EDITOR"]
            .into_iter()
            .filter_map(|var| env::var(var).ok())
            .find_map(|value| Self::parse(&value));
        if let Some(editor) = configured {
            return Ok(editor);
        }

        FALLBACK_EDITORS
            .into_iter()
            .find(|name| on_path(name))
            .and_then(Self::parse)
            .context("No editor found. Set $EDITOR, for example: export EDITOR=nano")
    }

    /// Run the editor on `path` and wait for it to exit
    fn run(&self, path: &Path) -> Result<()> {
        debug!("Running editor {:?} on {:?}", self.program, path);
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .status()
            .with_context(|| format!("Failed to run editor: {}", self.program))?;

        if !status.success() {
            bail!(
                "Editor '{}' exited with {}. Check that your editor is configured correctly.",
                self.program,
                status
            );
        }
        Ok(())
    }
}

/// Open `initial_content` in the user's editor and return the saved text
pub fn edit_text(initial_content: &str) -> Result<String> {
    edit_with(&EditorCommand::detect()?, initial_content)
}

/// Edit through a private temporary file that is deleted on return
fn edit_with(editor: &EditorCommand, initial_content: &str) -> Result<String> {
    let mut file = tempfile::Builder::new()
        .prefix("nestnote_edit_")
        .suffix(".txt")
        .tempfile()
        .context("Failed to create temp file for editing")?;
    file.write_all(initial_content.as_bytes())
        .and_then(|()| file.flush())
        .context("Failed to write temp file for editing")?;

    editor.run(file.path())?;

    // Many editors save by replacing the file, so read it back by path
    fs::read_to_string(file.path())
        .with_context(|| format!("Failed to read edited file: {:?}", file.path()))
}

/// Read all of standard input
pub fn read_stdin() -> Result<String> {
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read note from stdin")?;
    Ok(text)
}

/// Whether an executable file called `name` is in a PATH directory
fn on_path(name: &str) -> bool {
    let Some(paths) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&paths).any(|dir| {
        let candidate = dir.join(name);
        candidate.is_file() || candidate.with_extension("exe").is_file()
    })
}

/// Ask a yes/no question on the terminal
///
/// Without a terminal on stdin nothing is asked and the answer is no.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    read_answer(io::stdin().lock())
}

fn read_answer(mut input: impl BufRead) -> Result<bool> {
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes"
    ))
}
