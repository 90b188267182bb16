/*!
Worker status tracking and crawl termination.

This module defines:
- `DiscoveryListener`: the events a worker reports while it runs.
- `StatusAggregator`: the production listener. It keeps the worker counters and, from
  `supervise`, decides when the crawl is over and raises the stop signal.
- `StopSignal` / `StopListener`: a one-shot broadcast built on a watch channel.
*/

use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::sync::watch;

use super::store::FrontierStore;

/// Lifecycle events of one discovery worker.
pub trait DiscoveryListener: Send + Sync {
    /// The worker started and is idle.
    fn join(&self);
    /// The worker saw the stop signal and exits.
    fn leave(&self);
    /// The worker took a node from the frontier.
    fn working(&self);
    /// The node was discovered, or skipped as excluded.
    fn success_result(&self);
    /// The node could not be discovered.
    fn error_result(&self);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatusCounts {
    pub joined: usize,
    pub idle: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub errored: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// The seed failed before anything was discovered.
    BootstrapFailed,
    /// Nothing left to query.
    Exhausted { completed: usize, errored: usize },
}

#[derive(Debug)]
pub struct StopSignal {
    tx: watch::Sender<bool>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn raise(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_raised(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> StopListener {
        StopListener {
            rx: self.tx.subscribe(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StopListener {
    rx: watch::Receiver<bool>,
}

impl StopListener {
    pub fn is_raised(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal is raised.
    pub async fn raised(&mut self) {
        // a dropped sender means the crawl is gone, which is a stop as well
        let _ = self.rx.wait_for(|raised| *raised).await;
    }
}

pub struct StatusAggregator {
    counts: Mutex<StatusCounts>,
    stop: StopSignal,
    interval: Duration,
    log_every: u32,
}

impl StatusAggregator {
    pub fn new(interval: Duration, log_every: u32) -> Self {
        Self {
            counts: Mutex::new(StatusCounts::default()),
            stop: StopSignal::new(),
            interval,
            log_every: log_every.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StatusCounts> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> StatusCounts {
        *self.lock()
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    pub fn stop_listener(&self) -> StopListener {
        self.stop.subscribe()
    }

    /// Watches the counters until the crawl is over, then raises the stop signal.
    ///
    /// The crawl ends normally once no worker is busy, at least one node completed and
    /// the frontier can produce nothing more. It fails when the first nodes all errored.
    pub async fn supervise(&self, frontier: &FrontierStore) -> CrawlOutcome {
        let mut ticker = tokio::time::interval(self.interval);
        let mut ticks: u32 = 0;
        loop {
            ticker.tick().await;
            ticks = ticks.wrapping_add(1);
            let counts = self.snapshot();

            if ticks % self.log_every == 0 {
                tracing::info!(
                    idle = counts.idle,
                    querying = counts.in_progress,
                    completed = counts.completed,
                    errors = counts.errored,
                    known = frontier.len(),
                    pending = frontier.pending_len(),
                    "Status"
                );
            }

            if counts.completed == 0 && counts.errored > 0 {
                tracing::error!(errors = counts.errored, "No node could be queried, stopping");
                self.stop.raise();
                return CrawlOutcome::BootstrapFailed;
            }

            if counts.in_progress == 0 && counts.completed > 0 && frontier.is_exhausted() {
                tracing::info!(
                    completed = counts.completed,
                    errors = counts.errored,
                    "Crawl finished"
                );
                self.stop.raise();
                return CrawlOutcome::Exhausted {
                    completed: counts.completed,
                    errored: counts.errored,
                };
            }
        }
    }
}

impl DiscoveryListener for StatusAggregator {
    fn join(&self) {
        let mut counts = self.lock();
        counts.joined += 1;
        counts.idle += 1;
    }

    fn leave(&self) {
        let mut counts = self.lock();
        counts.joined = counts.joined.saturating_sub(1);
        counts.idle = counts.idle.saturating_sub(1);
    }

    fn working(&self) {
        let mut counts = self.lock();
        counts.idle = counts.idle.saturating_sub(1);
        counts.in_progress += 1;
    }

    fn success_result(&self) {
        let mut counts = self.lock();
        counts.in_progress = counts.in_progress.saturating_sub(1);
        counts.idle += 1;
        counts.completed += 1;
    }

    fn error_result(&self) {
        let mut counts = self.lock();
        counts.in_progress = counts.in_progress.saturating_sub(1);
        counts.idle += 1;
        counts.errored += 1;
    }
}
