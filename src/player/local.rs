//! Local playback engine
//!
//! Downloads each link, queues it, and plays queued files one at a time
//! through ffplay. The `(playing, queue)` pair lives behind one lock that
//! is never held across a download or a playback.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{BackendError, PlaybackBackend};
use crate::media::{Invocation, MediaFetcher, ProcessRunner};
use crate::models::QueueItem;

/// Mutable engine state, only touched while holding the lock
#[derive(Debug, Default)]
struct EngineState {
    /// True while a playback task is in flight
    playing: bool,
    /// Fetched items not yet started
    queue: VecDeque<QueueItem>,
}

struct Inner {
    fetcher: Arc<dyn MediaFetcher>,
    runner: Arc<dyn ProcessRunner>,
    /// Player binary
    player: String,
    state: Mutex<EngineState>,
    /// Mirrors `state.playing` for waiters
    playing_tx: watch::Sender<bool>,
}

/// Plays on the local speaker, strictly one item at a time
pub struct LocalPlaybackEngine {
    inner: Arc<Inner>,
}

impl LocalPlaybackEngine {
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        runner: Arc<dyn ProcessRunner>,
        player: impl Into<String>,
    ) -> Self {
        let (playing_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                fetcher,
                runner,
                player: player.into(),
                state: Mutex::new(EngineState::default()),
                playing_tx,
            }),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.inner.state.lock().playing
    }

    /// Links waiting behind the current playback, in play order
    pub fn queued(&self) -> Vec<String> {
        self.inner
            .state
            .lock()
            .queue
            .iter()
            .map(|item| item.source_url.clone())
            .collect()
    }

    /// Append a fetched item, starting playback if idle
    fn push(&self, item: QueueItem) {
        let mut state = self.inner.state.lock();
        state.queue.push_back(item);

        if !state.playing {
            if let Some(next) = state.queue.pop_front() {
                state.playing = true;
                self.inner.playing_tx.send_replace(true);
                tokio::spawn(play_loop(self.inner.clone(), next));
            }
        }
    }
}

/// Playback task: plays `item`, then keeps draining the queue until empty
async fn play_loop(inner: Arc<Inner>, mut item: QueueItem) {
    loop {
        inner.play(&item).await;

        let next = {
            let mut state = inner.state.lock();
            match state.queue.pop_front() {
                Some(next) => next,
                None => {
                    state.playing = false;
                    inner.playing_tx.send_replace(false);
                    return;
                }
            }
        };
        item = next;
    }
}

impl Inner {
    /// Run the player to completion; the exit status does not matter
    async fn play(&self, item: &QueueItem) {
        let Some(path) = item.local_path.as_deref() else {
            warn!(url = %item.source_url, "Skipping item that was never fetched");
            return;
        };

        info!("Playing {}", path.display());
        match self.runner.run(&Invocation::playback(&self.player, path)).await {
            Ok(outcome) if !outcome.is_success() => {
                debug!(path = %path.display(), %outcome, "Player exited unsuccessfully")
            }
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Player failed to start"),
        }
        info!("Playback complete");
    }
}

#[async_trait]
impl PlaybackBackend for LocalPlaybackEngine {
    async fn enqueue(&self, url: &str) -> Result<(), BackendError> {
        // Blocks the caller until the download finishes
        let path = self.inner.fetcher.fetch(url).await?;
        self.push(QueueItem::new(url).fetched(path));
        Ok(())
    }

    async fn wait_idle(&self) {
        let mut rx = self.inner.playing_tx.subscribe();
        let _ = rx.wait_for(|playing| !playing).await;
    }
}
