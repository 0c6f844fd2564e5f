//! fediplay - play music posted to a Mastodon hashtag
//!
//! # Usage
//!
//! ```bash
//! # Stream the timeline using ./settings.toml
//! fediplay
//!
//! # Use an explicit settings file with debug logging
//! fediplay -v --config ~/fediplay.toml stream
//! ```

use clap::Parser;

use fediplay::cli::{Cli, Command, ExitCode};
use fediplay::commands;
use fediplay::config::Config;
use fediplay::logging::init_logging;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_level()) {
        eprintln!("{}", e);
    }

    run(cli).await.into()
}

async fn run(cli: Cli) -> ExitCode {
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::ConfigError;
        }
    };

    match cli.command() {
        Command::Stream => commands::stream_cmd(&config).await,
        Command::Check => commands::check_cmd(&config).await,
        Command::Play(cmd) => commands::play_cmd(cmd, &config).await,
    }
}
