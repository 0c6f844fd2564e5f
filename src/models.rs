//! Data models for fediplay
//!
//! Wire records decoded from the Mastodon streaming API and the
//! in-process records handed to the playback engines.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

// =============================================================================
// Wire records
// =============================================================================

/// A hashtag attached to a status
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// A status (toot) as delivered in an `update` stream event
///
/// Only the fields the dispatcher needs are decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

// =============================================================================
// Feed Event
// =============================================================================

/// A single post observed on the live feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEvent {
    /// Hashtag names carried by the post
    pub tags: BTreeSet<String>,
    /// Raw HTML body of the post
    pub content_html: String,
}

impl FeedEvent {
    pub fn new<I, S>(tags: I, content_html: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            content_html: content_html.into(),
        }
    }
}

impl From<Status> for FeedEvent {
    fn from(status: Status) -> Self {
        Self {
            tags: status.tags.into_iter().map(|t| t.name).collect(),
            content_html: status.content,
        }
    }
}

// =============================================================================
// Queue Item
// =============================================================================

/// A media item moving through a playback engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    /// Link the item was requested from
    pub source_url: String,
    /// Downloaded file, absent until the fetch completes
    pub local_path: Option<PathBuf>,
}

impl QueueItem {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            local_path: None,
        }
    }

    /// Mark the item as fetched to `path`
    pub fn fetched(mut self, path: PathBuf) -> Self {
        self.local_path = Some(path);
        self
    }

    pub fn is_fetched(&self) -> bool {
        self.local_path.is_some()
    }
}
