//! Remote queue engine
//!
//! Every link gets its own background task: download, transcode to mp3,
//! then push the file into MPD. Pushes are serialized on the client
//! lock; downloads and transcodes are not, so items can reach the
//! remote queue out of request order.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

use super::mpd::RemoteQueueClient;
use super::{BackendError, PlaybackBackend};
use crate::media::process::transcoded_path;
use crate::media::{FetchError, Invocation, MediaFetcher, ProcessRunner};

struct Inner {
    fetcher: Arc<dyn MediaFetcher>,
    runner: Arc<dyn ProcessRunner>,
    /// Held across the network call
    client: Mutex<Box<dyn RemoteQueueClient>>,
    host: String,
    port: u16,
    /// Transcoder binary
    transcoder: String,
    /// Background tasks still running
    in_flight: watch::Sender<usize>,
}

/// Pushes transcoded downloads into a remote MPD queue
pub struct RemoteQueueEngine {
    inner: Arc<Inner>,
}

impl RemoteQueueEngine {
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        runner: Arc<dyn ProcessRunner>,
        client: Box<dyn RemoteQueueClient>,
        host: impl Into<String>,
        port: u16,
        transcoder: impl Into<String>,
    ) -> Self {
        let (in_flight, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                fetcher,
                runner,
                client: Mutex::new(client),
                host: host.into(),
                port,
                transcoder: transcoder.into(),
                in_flight,
            }),
        }
    }

    /// Number of links still being fetched, transcoded or pushed
    pub fn in_flight(&self) -> usize {
        *self.inner.in_flight.borrow()
    }
}

/// `file://` URI for `path`, made absolute against the working directory
fn file_uri(path: &Path) -> Result<String, BackendError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(BackendError::Path)?
            .join(path)
    };
    Ok(format!("file://{}", absolute.display()))
}

impl Inner {
    async fn deliver(&self, url: &str) {
        if let Err(e) = self.process(url).await {
            error!(url, error = %e, "Dropping item");
        }
    }

    async fn process(&self, url: &str) -> Result<(), BackendError> {
        let input = self.fetcher.fetch(url).await?;
        let output = self.transcode(&input).await?;
        let uri = file_uri(&output)?;
        self.push(&uri).await?;

        info!("Added {} to queue", output.display());
        Ok(())
    }

    async fn transcode(&self, input: &Path) -> Result<PathBuf, FetchError> {
        let output = transcoded_path(input);
        let outcome = self
            .runner
            .run(&Invocation::transcode(&self.transcoder, input, &output))
            .await?;
        if !outcome.is_success() {
            return Err(FetchError::Transcode {
                path: input.to_path_buf(),
                status: outcome,
            });
        }
        Ok(output)
    }

    /// Push under the client lock, reconnecting and retrying once on failure
    async fn push(&self, uri: &str) -> Result<(), BackendError> {
        let mut client = self.client.lock().await;
        if let Err(e) = client.add(uri).await {
            warn!(error = %e, host = %self.host, port = self.port, "Push failed, reconnecting");
            client.connect(&self.host, self.port).await?;
            client.add(uri).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PlaybackBackend for RemoteQueueEngine {
    async fn enqueue(&self, url: &str) -> Result<(), BackendError> {
        let inner = self.inner.clone();
        let url = url.to_string();

        inner.in_flight.send_modify(|n| *n += 1);
        tokio::spawn(async move {
            inner.deliver(&url).await;
            inner.in_flight.send_modify(|n| *n -= 1);
        });
        Ok(())
    }

    async fn wait_idle(&self) {
        let mut rx = self.inner.in_flight.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_uri_absolute() {
        let uri = file_uri(Path::new("/srv/music/song.mp4.mp3")).unwrap();
        assert_eq!(uri, "file:///srv/music/song.mp4.mp3");
    }

    #[test]
    fn test_file_uri_relative_is_resolved() {
        let uri = file_uri(Path::new("music/song.mp3")).unwrap();
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(uri, format!("file://{}", cwd.join("music/song.mp3").display()));
    }
}
