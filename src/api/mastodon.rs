//! Mastodon streaming client
//!
//! Subscribes to the user timeline over server-sent events and turns
//! every `update` event into a [`FeedEvent`].

use futures::stream::{self, Stream};
use std::collections::VecDeque;
use thiserror::Error;

use crate::models::{FeedEvent, Status};

/// Errors from the feed subscription
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Streaming request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Streaming endpoint returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

/// One decoded server-sent event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental server-sent-event decoder
///
/// Bytes go in as they arrive; complete events (terminated by a blank
/// line) come out.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    current: SseEvent,
    has_data: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every event it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if self.has_data || self.current.event.is_some() {
                    events.push(std::mem::take(&mut self.current));
                }
                self.has_data = false;
                continue;
            }
            if line.starts_with(':') {
                // comment / heartbeat
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => self.current.event = Some(value.to_string()),
                "data" => {
                    if self.has_data {
                        self.current.data.push('\n');
                    }
                    self.current.data.push_str(value);
                    self.has_data = true;
                }
                _ => {}
            }
        }
        events
    }
}

/// Decode an `update` event into a feed event; anything else is ignored
pub fn feed_event(sse: &SseEvent) -> Option<FeedEvent> {
    if sse.event.as_deref() != Some("update") {
        return None;
    }
    match serde_json::from_str::<Status>(&sse.data) {
        Ok(status) => Some(status.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Skipping undecodable status");
            None
        }
    }
}

/// Client for the Mastodon streaming API
pub struct StreamingClient {
    base_url: String,
    access_token: String,
    client: reqwest::Client,
}

impl StreamingClient {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: access_token.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Open the user timeline stream
    pub async fn user_stream(&self) -> Result<FeedSubscription, FeedError> {
        let url = format!("{}/api/v1/streaming/user", self.base_url);
        tracing::info!("Streaming from {}", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status));
        }

        Ok(FeedSubscription {
            response,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
        })
    }
}

/// A live subscription to the user timeline
pub struct FeedSubscription {
    response: reqwest::Response,
    decoder: SseDecoder,
    pending: VecDeque<FeedEvent>,
}

impl FeedSubscription {
    /// Next post from the feed, `None` once the server closes the stream
    pub async fn next_event(&mut self) -> Result<Option<FeedEvent>, FeedError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            let Some(chunk) = self.response.chunk().await? else {
                return Ok(None);
            };
            self.pending
                .extend(self.decoder.push(&chunk).iter().filter_map(feed_event));
        }
    }

    /// Adapt into a stream that ends after the first error
    pub fn into_stream(self) -> impl Stream<Item = Result<FeedEvent, FeedError>> {
        stream::unfold(Some(self), |state| async move {
            let mut sub = state?;
            match sub.next_event().await {
                Ok(Some(event)) => Some((Ok(event), Some(sub))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}
