//! Progress Observation
//!
//! The generator reports its position through an injected
//! [`ProgressObserver`] rather than printing or logging on its own. This
//! keeps the cadence (every N records) in one place and lets embedders
//! route progress wherever they want: a log line, a metrics gauge, a TUI.
//!
//! Observers are shared across the pipeline via `Arc` and must therefore
//! be `Send + Sync`. Callbacks run on the generator task; keep them cheap.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

/// Receives the generator's position at each progress interval.
pub trait ProgressObserver: Send + Sync {
    /// Called with the value of the record just emitted.
    fn on_progress(&self, records: u64);
}

/// Emits progress as `info`-level tracing events.
#[derive(Debug, Default)]
pub struct TracingProgress;

impl ProgressObserver for TracingProgress {
    fn on_progress(&self, records: u64) {
        info!(records, "pipeline progress");
    }
}

/// Discards progress callbacks. The default for embedded pipelines.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn on_progress(&self, _records: u64) {}
}

/// Remembers the most recent position. Handy for polling from another task.
#[derive(Debug, Default)]
pub struct LatestProgress {
    records: AtomicU64,
}

impl LatestProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> u64 {
        self.records.load(Ordering::Acquire)
    }
}

impl ProgressObserver for LatestProgress {
    fn on_progress(&self, records: u64) {
        self.records.store(records, Ordering::Release);
    }
}
