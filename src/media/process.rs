//! External process invocation
//!
//! Playback and transcoding both shell out to ffmpeg tools. The
//! [`ProcessRunner`] seam lets the engines be driven by fakes in tests.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// Extension of the transcoded form pushed to the remote daemon
pub const TRANSCODE_EXTENSION: &str = "mp3";

/// Errors from starting an external process
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Program '{0}' not found. Install it first.")]
    NotFound(String),
    #[error("Failed to run '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// How an external process finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
}

impl ExitOutcome {
    pub fn success() -> Self {
        Self { code: Some(0) }
    }

    pub fn failure(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitOutcome {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl std::fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// A program plus its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Headless ffplay run that exits when the file ends
    pub fn playback(player: &str, path: &Path) -> Self {
        Self::new(player)
            .args(["-v", "0", "-nostats", "-hide_banner", "-autoexit", "-nodisp"])
            .arg(path.display().to_string())
    }

    /// ffmpeg conversion of `input` into `output`, overwriting
    pub fn transcode(transcoder: &str, input: &Path, output: &Path) -> Self {
        Self::new(transcoder)
            .args(["-y", "-hide_banner", "-loglevel", "panic", "-i"])
            .arg(input.display().to_string())
            .arg(output.display().to_string())
    }
}

/// Path of the transcoded form of `input` (`song.webm` -> `song.webm.mp3`)
pub fn transcoded_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".");
    name.push(TRANSCODE_EXTENSION);
    PathBuf::from(name)
}

/// Runs an external program to completion
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<ExitOutcome, ProcessError>;
}

/// [`ProcessRunner`] backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRunner;

#[async_trait]
impl ProcessRunner for CommandRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ExitOutcome, ProcessError> {
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ProcessError::NotFound(invocation.program.clone())
                } else {
                    ProcessError::Io {
                        program: invocation.program.clone(),
                        source: e,
                    }
                }
            })?;
        Ok(status.into())
    }
}
