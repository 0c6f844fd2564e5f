//! Event dispatch
//!
//! Filters feed posts by hashtag, picks the first non-mention link out of
//! the post body, and hands it to the configured backend.

use futures::{Stream, StreamExt};
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::api::FeedError;
use crate::config::BackendConfig;
use crate::models::FeedEvent;
use crate::player::PlaybackBackend;

/// Class marking user-mention (and hashtag) anchors
const MENTION_CLASS: &str = "mention";

/// All outbound links in `html`, minus mention anchors, in document order
pub fn extract_links(html: &str) -> Vec<String> {
    let document = Html::parse_fragment(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter(|anchor| {
            !anchor
                .value()
                .attr("class")
                .is_some_and(|class| class.split_whitespace().any(|c| c == MENTION_CLASS))
        })
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(str::to_string)
        .collect()
}

/// Routes matching feed events into a playback backend
pub struct EventDispatcher {
    tags: BTreeSet<String>,
    backend: Arc<dyn PlaybackBackend>,
}

impl EventDispatcher {
    pub fn new(config: &BackendConfig, backend: Arc<dyn PlaybackBackend>) -> Self {
        Self {
            tags: config.tags.clone(),
            backend,
        }
    }

    /// First configured tag carried by `event`, if any
    pub fn matched_tag<'a>(&self, event: &'a FeedEvent) -> Option<&'a str> {
        event
            .tags
            .iter()
            .find(|tag| self.tags.contains(*tag))
            .map(String::as_str)
    }

    /// Handle one post. Failures are logged, never returned, so a bad
    /// link cannot stop the feed loop.
    pub async fn on_event(&self, event: &FeedEvent) {
        let Some(tag) = self.matched_tag(event) else {
            return;
        };

        let links = extract_links(&event.content_html);
        let Some(link) = links.first() else {
            debug!(tag, "Tagged post has no playable link");
            return;
        };

        info!("Added {}", link);
        if let Err(e) = self.backend.enqueue(link).await {
            error!(url = %link, error = %e, "Failed to enqueue");
        }
    }

    /// Dispatch every event from `events` until the feed ends or fails
    pub async fn run<S>(&self, events: S) -> Result<(), FeedError>
    where
        S: Stream<Item = Result<FeedEvent, FeedError>>,
    {
        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            self.on_event(&event?).await;
        }
        Ok(())
    }
}
