//! Media acquisition
//!
//! - Fetch: yt-dlp downloads of post links
//! - Process: ffplay/ffmpeg invocations

pub mod fetch;
pub mod process;

pub use fetch::{FetchError, MediaFetcher, YtDlpFetcher};
pub use process::{CommandRunner, ExitOutcome, Invocation, ProcessError, ProcessRunner};
