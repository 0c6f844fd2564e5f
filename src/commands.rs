//! CLI Command Handlers
//!
//! Each handler takes the loaded config, does its work, and returns an
//! ExitCode. Configuration is validated before any backend is built.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::{FeedError, StreamingClient};
use crate::cli::{ExitCode, PlayCmd};
use crate::config::{BackendConfig, Config, ConfigError};
use crate::dispatch::EventDispatcher;
use crate::player::{build_backend, ensure_music_dir, PlaybackBackend};

fn config_error(e: ConfigError) -> ExitCode {
    error!("{}", e);
    ExitCode::ConfigError
}

/// Validate config, create the music dir, and build the backend
async fn prepare(config: &Config) -> Result<(BackendConfig, Arc<dyn PlaybackBackend>), ExitCode> {
    let backend_config = config.backend_config().map_err(config_error)?;

    if let Err(e) = ensure_music_dir(&backend_config.music_dir).await {
        error!(
            dir = %backend_config.music_dir.display(),
            error = %e,
            "Cannot create music directory"
        );
        return Err(ExitCode::Error);
    }

    let backend = build_backend(&backend_config);
    Ok((backend_config, backend))
}

// =============================================================================
// Stream Command
// =============================================================================

pub async fn stream_cmd(config: &Config) -> ExitCode {
    let (base_url, token) = match (config.api_base_url(), config.access_token()) {
        (Ok(base_url), Ok(token)) => (base_url, token),
        (Err(e), _) | (_, Err(e)) => return config_error(e),
    };

    let (backend_config, backend) = match prepare(config).await {
        Ok(prepared) => prepared,
        Err(code) => return code,
    };
    info!(player = %backend_config.player, tags = ?backend_config.tags, "Backend ready");

    let dispatcher = EventDispatcher::new(&backend_config, backend);
    let client = StreamingClient::new(base_url, token);

    let result = match client.user_stream().await {
        Ok(subscription) => dispatcher.run(subscription.into_stream()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            warn!("Stream closed by server");
            ExitCode::NetworkError
        }
        Err(FeedError::Status(status)) if status == reqwest::StatusCode::UNAUTHORIZED => {
            error!("Access token rejected by {}", base_url);
            ExitCode::ConfigError
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::NetworkError
        }
    }
}

// =============================================================================
// Check Command
// =============================================================================

pub async fn check_cmd(config: &Config) -> ExitCode {
    let backend_config = match config.backend_config() {
        Ok(backend_config) => backend_config,
        Err(e) => return config_error(e),
    };

    let tags: Vec<&str> = backend_config.tags.iter().map(String::as_str).collect();
    println!("player:    {}", backend_config.player);
    println!("tags:      {}", tags.join(", "));
    println!("music dir: {}", backend_config.music_dir.display());
    println!(
        "instance:  {}",
        config.api_base_url().unwrap_or("(not set)")
    );

    if let Err(e) = config.access_token() {
        warn!("{}", e);
    }
    ExitCode::Success
}

// =============================================================================
// Play Command
// =============================================================================

pub async fn play_cmd(cmd: PlayCmd, config: &Config) -> ExitCode {
    let (_, backend) = match prepare(config).await {
        Ok(prepared) => prepared,
        Err(code) => return code,
    };

    if let Err(e) = backend.enqueue(&cmd.url).await {
        error!(url = %cmd.url, error = %e, "Failed to enqueue");
        return ExitCode::Error;
    }
    backend.wait_idle().await;
    ExitCode::Success
}
