//! CLI - Command Line Interface for fediplay
//!
//! # Examples
//!
//! ```bash
//! # Watch the timeline and play everything tagged #fediplay
//! fediplay
//!
//! # Validate settings without connecting
//! fediplay check --config settings.toml
//!
//! # Play one link through the configured backend
//! fediplay play https://video.example/watch?v=1
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogLevel;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid or incomplete configuration
    ConfigError = 2,
    /// Feed or network failure
    NetworkError = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// fediplay - play music posted to a Mastodon hashtag
///
/// Run without a subcommand to start streaming.
#[derive(Parser, Debug)]
#[command(
    name = "fediplay",
    version,
    about = "Play music posted to a Mastodon hashtag",
    long_about = "Watches your Mastodon timeline for posts carrying a configured \
                  hashtag, downloads the linked media, and plays it on this \
                  machine or queues it on an MPD server."
)]
pub struct Cli {
    /// Path to settings file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Log per-item diagnostics
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Subcommand to run (omit to stream)
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_flags(self.verbose, self.quiet)
    }

    /// Subcommand with `stream` as the default
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Stream)
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stream the timeline and play tagged posts (default)
    Stream,

    /// Validate settings and show the resolved backend
    Check,

    /// Enqueue a single link and wait for it to finish
    Play(PlayCmd),
}

/// Play one link without a feed
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PlayCmd {
    /// Media link (anything yt-dlp understands)
    #[arg(required = true)]
    pub url: String,
}
