//! Media fetching via yt-dlp
//!
//! Resolves a post link to a downloaded audio/video file under the
//! music directory.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

use super::process::{ExitOutcome, ProcessError};

/// Errors from downloading or transcoding a link
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to start downloader: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Downloader failed for {url} ({status}): {stderr}")]
    Downloader {
        url: String,
        status: ExitOutcome,
        stderr: String,
    },
    #[error("Downloader produced no file for {0}")]
    NoOutput(String),
    #[error("Transcode of {} failed ({})", .path.display(), .status)]
    Transcode { path: PathBuf, status: ExitOutcome },
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Downloads the media behind a link
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch `url` and return the local file it was saved to
    async fn fetch(&self, url: &str) -> Result<PathBuf, FetchError>;
}

/// [`MediaFetcher`] that shells out to yt-dlp
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    /// Path to the yt-dlp binary
    binary: String,
    /// Directory files are written into
    music_dir: PathBuf,
    no_check_certificate: bool,
}

impl YtDlpFetcher {
    pub fn new(music_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            music_dir: music_dir.into(),
            no_check_certificate: false,
        }
    }

    /// Use a custom downloader binary
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn no_check_certificate(mut self, skip: bool) -> Self {
        self.no_check_certificate = skip;
        self
    }

    pub fn music_dir(&self) -> &Path {
        &self.music_dir
    }

    /// Output template: `<music_dir>/<title>.<ext>`
    fn output_template(&self) -> String {
        self.music_dir
            .join("%(title)s.%(ext)s")
            .display()
            .to_string()
    }

    /// Arguments passed to the downloader for `url`
    pub fn args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            "mp3/mp4".to_string(),
            "-o".to_string(),
            self.output_template(),
            "--no-progress".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
        ];
        if self.no_check_certificate {
            args.push("--no-check-certificate".to_string());
        }
        args.push(url.to_string());
        args
    }
}

/// Last non-empty line of downloader stdout, which is the final file path
fn parse_printed_path(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(PathBuf::from)
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str) -> Result<PathBuf, FetchError> {
        tracing::debug!(url, binary = %self.binary, "Fetching media");

        let output = Command::new(&self.binary)
            .args(self.args(url))
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(FetchError::Downloader {
                url: url.to_string(),
                status: output.status.into(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_printed_path(&stdout).ok_or_else(|| FetchError::NoOutput(url.to_string()))
    }
}
