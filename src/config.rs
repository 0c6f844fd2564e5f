//! Configuration management for fediplay
//!
//! Settings are read from a TOML file and a handful of environment
//! variables, then validated once into an immutable [`BackendConfig`].
//! Lookup order: `--config <path>`, `./settings.toml`,
//! `~/.config/fediplay/config.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Hashtag watched when none is configured
pub const DEFAULT_TAG: &str = "fediplay";

/// Default MPD port
pub const DEFAULT_MPD_PORT: u16 = 6600;

/// Settings file looked up in the working directory
const LOCAL_SETTINGS_FILE: &str = "settings.toml";

const ENV_API_BASE_URL: &str = "FEDIPLAY_API_BASE_URL";
const ENV_ACCESS_TOKEN: &str = "FEDIPLAY_ACCESS_TOKEN";
const ENV_NO_CHECK_CERTIFICATE: &str = "FEDIPLAY_NO_CHECK_CERTIFICATE";

/// Errors from loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Unknown player: {0}")]
    UnknownPlayer(String),
    #[error("player_settings.host parameter is required!")]
    MissingHost,
    #[error("api_base_url is not in settings nor is the FEDIPLAY_API_BASE_URL environment variable set")]
    MissingApiBaseUrl,
    #[error("access_token is not in settings nor is the FEDIPLAY_ACCESS_TOKEN environment variable set")]
    MissingAccessToken,
}

fn default_tags() -> Vec<String> {
    vec![DEFAULT_TAG.to_string()]
}

fn default_player() -> String {
    "local".to_string()
}

fn default_music_dir() -> PathBuf {
    PathBuf::from("./music")
}

/// `[player_settings]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSettings {
    /// MPD host, required for the radio player
    pub host: Option<String>,
    /// MPD port (default 6600)
    pub port: Option<u16>,
}

/// `[binaries]` table: external programs the engines shell out to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Binaries {
    pub downloader: String,
    pub player: String,
    pub transcoder: String,
}

impl Default for Binaries {
    fn default() -> Self {
        Self {
            downloader: "yt-dlp".to_string(),
            player: "ffplay".to_string(),
            transcoder: "ffmpeg".to_string(),
        }
    }
}

/// Raw settings as found in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Mastodon instance, e.g. https://mastodon.social
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// User access token for the streaming API
    #[serde(default)]
    pub access_token: Option<String>,
    /// Hashtags that trigger playback
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,
    /// "local" or "radio"
    #[serde(default = "default_player")]
    pub player: String,
    #[serde(default)]
    pub player_settings: PlayerSettings,
    /// Where downloads and transcodes land
    #[serde(default = "default_music_dir")]
    pub music_dir: PathBuf,
    #[serde(default)]
    pub binaries: Binaries,
    /// Skip TLS certificate checks in the downloader
    #[serde(default)]
    pub no_check_certificate: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            access_token: None,
            tags: default_tags(),
            player: default_player(),
            player_settings: PlayerSettings::default(),
            music_dir: default_music_dir(),
            binaries: Binaries::default(),
            no_check_certificate: false,
        }
    }
}

/// Which playback backend to construct
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerSelection {
    /// Play on the local speaker, one item at a time
    Local,
    /// Push into a remote MPD queue
    Radio { host: String, port: u16 },
}

impl std::fmt::Display for PlayerSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerSelection::Local => write!(f, "local"),
            PlayerSelection::Radio { host, port } => write!(f, "radio ({}:{})", host, port),
        }
    }
}

/// Validated, immutable backend configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub tags: BTreeSet<String>,
    pub player: PlayerSelection,
    pub music_dir: PathBuf,
    pub binaries: Binaries,
    pub no_check_certificate: bool,
}

impl Config {
    /// Default user config path (~/.config/fediplay/config.toml)
    pub fn user_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("fediplay").join("config.toml"))
    }

    /// Load settings from an explicit path, or from the first default
    /// location that exists. No file at all yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(),
        };

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_SETTINGS_FILE);
        if local.exists() {
            return Some(local);
        }
        Self::user_path().filter(|p| p.exists())
    }

    /// Parse a settings file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Fill gaps from the environment
    fn apply_env(&mut self) {
        if self.api_base_url.is_none() {
            self.api_base_url = std::env::var(ENV_API_BASE_URL).ok().filter(|s| !s.is_empty());
        }
        if let Ok(token) = std::env::var(ENV_ACCESS_TOKEN) {
            if !token.is_empty() {
                self.access_token = Some(token);
            }
        }
        if std::env::var_os(ENV_NO_CHECK_CERTIFICATE).is_some() {
            self.no_check_certificate = true;
        }
    }

    /// Validate the player section into a [`BackendConfig`]
    pub fn backend_config(&self) -> Result<BackendConfig, ConfigError> {
        let player = match self.player.as_str() {
            "local" => PlayerSelection::Local,
            "radio" => {
                let host = self
                    .player_settings
                    .host
                    .clone()
                    .filter(|h| !h.is_empty())
                    .ok_or(ConfigError::MissingHost)?;
                PlayerSelection::Radio {
                    host,
                    port: self.player_settings.port.unwrap_or(DEFAULT_MPD_PORT),
                }
            }
            other => return Err(ConfigError::UnknownPlayer(other.to_string())),
        };

        Ok(BackendConfig {
            tags: self.tags.iter().cloned().collect(),
            player,
            music_dir: self.music_dir.clone(),
            binaries: self.binaries.clone(),
            no_check_certificate: self.no_check_certificate,
        })
    }

    pub fn api_base_url(&self) -> Result<&str, ConfigError> {
        self.api_base_url
            .as_deref()
            .map(|s| s.trim_end_matches('/'))
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingApiBaseUrl)
    }

    pub fn access_token(&self) -> Result<&str, ConfigError> {
        self.access_token
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingAccessToken)
    }
}
