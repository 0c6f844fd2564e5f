//! Playback backends
//!
//! - Local: sequential playback on this machine via ffplay
//! - Radio: transcode and push into a remote MPD queue
//! - Mpd: the minimal MPD client the radio backend uses

pub mod local;
pub mod mpd;
pub mod radio;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{BackendConfig, PlayerSelection};
use crate::media::{CommandRunner, FetchError, YtDlpFetcher};

pub use local::LocalPlaybackEngine;
pub use mpd::{ConnectionError, MpdClient, RemoteQueueClient};
pub use radio::RemoteQueueEngine;

/// Errors a backend can surface
#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("Cannot resolve media path: {0}")]
    Path(#[source] std::io::Error),
}

/// Playback/queueing strategy selected by configuration
#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    /// Hand a link to the backend
    ///
    /// Returns as soon as the work is handed off. The local engine
    /// downloads inline first, so its fetch errors come back here;
    /// the radio engine reports everything through logs.
    async fn enqueue(&self, url: &str) -> Result<(), BackendError>;

    /// Wait until every accepted link has been played or pushed
    async fn wait_idle(&self) {}
}

/// Construct the backend named by `config`
pub fn build_backend(config: &BackendConfig) -> Arc<dyn PlaybackBackend> {
    let fetcher = Arc::new(
        YtDlpFetcher::new(&config.music_dir)
            .with_binary(&config.binaries.downloader)
            .no_check_certificate(config.no_check_certificate),
    );
    let runner = Arc::new(CommandRunner);

    match &config.player {
        PlayerSelection::Local => Arc::new(LocalPlaybackEngine::new(
            fetcher,
            runner,
            config.binaries.player.clone(),
        )),
        PlayerSelection::Radio { host, port } => Arc::new(RemoteQueueEngine::new(
            fetcher,
            runner,
            Box::new(MpdClient::new()),
            host.clone(),
            *port,
            config.binaries.transcoder.clone(),
        )),
    }
}

/// Create the download directory; existing directories are fine
pub async fn ensure_music_dir(path: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn test_ensure_music_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("music");

        ensure_music_dir(&dir).await.unwrap();
        assert!(dir.is_dir());
        ensure_music_dir(&dir).await.unwrap();
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_build_backend_for_each_player() {
        let local = Config::default().backend_config().unwrap();
        let _ = build_backend(&local);

        let radio = Config::from_toml(
            r#"
            player = "radio"
            [player_settings]
            host = "localhost"
            "#,
        )
        .unwrap()
        .backend_config()
        .unwrap();
        let _ = build_backend(&radio);
    }
}
