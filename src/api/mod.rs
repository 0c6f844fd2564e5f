//! API clients for external services
//!
//! - Mastodon: live user timeline over the streaming API

pub mod mastodon;

pub use mastodon::{FeedError, FeedSubscription, StreamingClient};
