//! Fakes shared by the integration tests
//!
//! Stand-ins for the downloader, the external player/transcoder, and the
//! MPD connection, each recording what the engines asked of it.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use fediplay::media::{ExitOutcome, FetchError, Invocation, MediaFetcher, ProcessError, ProcessRunner};
use fediplay::player::{ConnectionError, RemoteQueueClient};

// =============================================================================
// Fetcher
// =============================================================================

/// Maps `https://host/<name>` to `music/<name>.mp4`
///
/// Links containing "broken" fail. `delays` (ms) are consumed one per
/// fetch to shuffle completion order.
#[derive(Default)]
pub struct FakeFetcher {
    pub delays: Mutex<VecDeque<u64>>,
    pub fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn with_delays(delays: impl IntoIterator<Item = u64>) -> Self {
        Self {
            delays: Mutex::new(delays.into_iter().collect()),
            fetched: Mutex::new(Vec::new()),
        }
    }
}

pub fn path_for(url: &str) -> PathBuf {
    let name = url.rsplit('/').next().unwrap_or(url);
    PathBuf::from(format!("music/{}.mp4", name))
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<PathBuf, FetchError> {
        let delay = self.delays.lock().pop_front();
        if let Some(ms) = delay {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if url.contains("broken") {
            return Err(FetchError::NoOutput(url.to_string()));
        }
        self.fetched.lock().push(url.to_string());
        Ok(path_for(url))
    }
}

// =============================================================================
// Process Runner
// =============================================================================

/// Player whose runs only finish when the test releases them
pub struct GatedRunner {
    gate: Semaphore,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub started: Mutex<Vec<PathBuf>>,
    pub finished: Mutex<Vec<PathBuf>>,
    exit_code: i32,
}

impl GatedRunner {
    /// Runs block until `release` is called
    pub fn gated() -> Self {
        Self::new(0, 0)
    }

    /// Runs finish straight away with `exit_code`
    pub fn open(exit_code: i32) -> Self {
        Self::new(Semaphore::MAX_PERMITS, exit_code)
    }

    fn new(permits: usize, exit_code: i32) -> Self {
        Self {
            gate: Semaphore::new(permits),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
            finished: Mutex::new(Vec::new()),
            exit_code,
        }
    }

    /// Let `n` runs complete
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn started_count(&self) -> usize {
        self.started.lock().len()
    }
}

#[async_trait]
impl ProcessRunner for GatedRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ExitOutcome, ProcessError> {
        let path = PathBuf::from(invocation.args.last().cloned().unwrap_or_default());

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.started.lock().push(path.clone());

        // yield so overlapping runs would be observed
        tokio::time::sleep(Duration::from_millis(2)).await;
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.finished.lock().push(path);
        Ok(ExitOutcome::failure(self.exit_code))
    }
}

/// Records every invocation and reports a fixed exit code
pub struct RecordingRunner {
    pub invocations: Mutex<Vec<Invocation>>,
    exit_code: i32,
}

impl RecordingRunner {
    pub fn new(exit_code: i32) -> Self {
        Self {
            invocations: Mutex::new(Vec::new()),
            exit_code,
        }
    }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ExitOutcome, ProcessError> {
        self.invocations.lock().push(invocation.clone());
        Ok(ExitOutcome::failure(self.exit_code))
    }
}

// =============================================================================
// Remote Queue Client
// =============================================================================

/// What the fake MPD connection was asked to do
#[derive(Debug, Default)]
pub struct ClientLog {
    pub connects: Vec<(String, u16)>,
    pub add_attempts: Vec<String>,
    pub added: Vec<String>,
    /// Scripted outcome per add attempt; missing entries succeed
    pub add_script: VecDeque<bool>,
    pub fail_connect: bool,
}

/// [`RemoteQueueClient`] backed by a shared [`ClientLog`]
pub struct FakeClient {
    pub log: Arc<Mutex<ClientLog>>,
}

impl FakeClient {
    pub fn new(add_script: impl IntoIterator<Item = bool>) -> (Self, Arc<Mutex<ClientLog>>) {
        let log = Arc::new(Mutex::new(ClientLog {
            add_script: add_script.into_iter().collect(),
            ..ClientLog::default()
        }));
        (Self { log: log.clone() }, log)
    }
}

#[async_trait]
impl RemoteQueueClient for FakeClient {
    async fn connect(&mut self, host: &str, port: u16) -> Result<(), ConnectionError> {
        let mut log = self.log.lock();
        log.connects.push((host.to_string(), port));
        if log.fail_connect {
            return Err(ConnectionError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused",
            )));
        }
        Ok(())
    }

    async fn add(&mut self, uri: &str) -> Result<(), ConnectionError> {
        let mut log = self.log.lock();
        log.add_attempts.push(uri.to_string());
        if log.add_script.pop_front().unwrap_or(true) {
            log.added.push(uri.to_string());
            Ok(())
        } else {
            Err(ConnectionError::NotConnected)
        }
    }
}

/// Poll `cond` until it holds or a second passes
pub async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}
