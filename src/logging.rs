//! Logging setup
//!
//! All output goes through `tracing`; this installs the stderr subscriber.
//! `FEDIPLAY_LOG` (then `RUST_LOG`) overrides the verbosity chosen on the
//! command line.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Verbosity selected by CLI flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Warnings and errors only
    Quiet,
    /// Normal operation
    #[default]
    Info,
    /// Include per-item diagnostics
    Debug,
}

impl LogLevel {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (true, _) => LogLevel::Debug,
            (false, true) => LogLevel::Quiet,
            _ => LogLevel::Info,
        }
    }

    fn directive(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "fediplay=warn",
            LogLevel::Info => "fediplay=info",
            LogLevel::Debug => "fediplay=debug",
        }
    }
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
#[error("Failed to initialize tracing subscriber: {0}")]
pub struct LoggingError(String);

fn env_filter(level: LogLevel) -> EnvFilter {
    std::env::var("FEDIPLAY_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new(level.directive()))
}

/// Install the global subscriber
pub fn init_logging(level: LogLevel) -> Result<(), LoggingError> {
    let layer = fmt::layer()
        .with_target(level == LogLevel::Debug)
        .with_writer(std::io::stderr)
        .compact();

    Registry::default()
        .with(layer)
        .with(env_filter(level))
        .try_init()
        .map_err(|e| LoggingError(e.to_string()))
}
