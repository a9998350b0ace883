//! CLI command modules for shoebox.
//!
//! Every command handler returns a [`CommandResult`]; a failure carries the
//! process exit code for its category alongside the causal error chain, so
//! `main` stays a thin dispatcher.

pub mod archive;
pub mod import;
pub mod init;
pub mod mega;
pub mod output;
pub mod rearchive;
pub mod unimport;

use std::io::{self, Write};
use std::path::PathBuf;

/// Exit codes shared across commands.
pub const EXIT_INPUT: u8 = 1;
pub const EXIT_STORE: u8 = 2;
pub const EXIT_OPERATION: u8 = 3;
pub const EXIT_UPLOAD: u8 = 4;

/// A command failure: which small positive exit code to die with, plus the
/// error chain to print.
#[derive(Debug)]
pub struct CommandFailure {
    pub exit_code: u8,
    pub error: anyhow::Error,
}

pub type CommandResult = Result<(), CommandFailure>;

/// Wrap an error into a [`CommandFailure`] with the given exit code.
pub fn fail(exit_code: u8, error: impl Into<anyhow::Error>) -> CommandFailure {
    CommandFailure {
        exit_code,
        error: error.into(),
    }
}

/// Shoebox home directory: `$SHOEBOX_HOME` or `~/.shoebox`.
pub fn shoebox_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("SHOEBOX_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".shoebox")
}

/// Ensure and return the log directory under the shoebox home.
pub fn ensure_logs_dir() -> io::Result<PathBuf> {
    let logs = shoebox_home().join("logs");
    std::fs::create_dir_all(&logs)?;
    Ok(logs)
}

/// Ask the user a yes/no question on stdin.
pub fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{prompt} [y/n]: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("y"))
}

/// Wait for the user to press enter.
pub fn press_enter(prompt: &str) -> io::Result<()> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(())
}

/// Split a comma-separated filter list into trimmed, non-empty terms.
pub fn parse_filters(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
