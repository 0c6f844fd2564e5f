//! fediplay - play music posted to a Mastodon hashtag
//!
//! Watches the live timeline, picks out posts carrying a configured
//! hashtag, downloads the linked media, and either plays it locally or
//! pushes it into an MPD queue.
//!
//! # Modules
//!
//! - `models` - Feed events and queue items
//! - `api` - Mastodon streaming client
//! - `dispatch` - Hashtag filter and link extraction
//! - `player` - Local and MPD playback backends
//! - `media` - yt-dlp and ffmpeg wrappers
//! - `config` - Settings file and validation

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod logging;
pub mod media;
pub mod models;
pub mod player;

// Re-export commonly used types
pub use config::{BackendConfig, Config, ConfigError, PlayerSelection};
pub use dispatch::{extract_links, EventDispatcher};
pub use models::{FeedEvent, QueueItem};
pub use player::{
    build_backend, BackendError, LocalPlaybackEngine, PlaybackBackend, RemoteQueueEngine,
};
