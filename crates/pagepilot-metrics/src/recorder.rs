//! Tracker plus optional persistence

use pagepilot_core::fail_open::fail_open;

use crate::storage::MetricsStorage;
use crate::tracker::{MetricEntry, MetricPhase, MetricsSummary, MetricsTracker, PhaseMetrics};

/// Session metrics log that also appends each entry to disk when configured
///
/// Persistence is fail-open: a write failure is logged and the in-memory
/// entry is kept.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder {
    tracker: MetricsTracker,
    storage: Option<MetricsStorage>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_storage(storage: MetricsStorage) -> Self {
        Self {
            tracker: MetricsTracker::new(),
            storage: Some(storage),
        }
    }

    pub async fn record(&mut self, phase: MetricPhase, token_count: u64, elapsed_seconds: f64) -> MetricEntry {
        let entry = self.tracker.record(phase, token_count, elapsed_seconds);
        if let Some(storage) = &self.storage {
            fail_open("metrics append", || storage.store(&entry)).await;
        }
        entry
    }

    pub fn tracker(&self) -> &MetricsTracker {
        &self.tracker
    }

    pub fn current(&self) -> PhaseMetrics {
        self.tracker.current()
    }

    pub fn summary(&self) -> MetricsSummary {
        self.tracker.summary()
    }

    /// Clear the in-memory log. The on-disk file is history and stays.
    pub fn reset(&mut self) {
        self.tracker.reset();
    }
}
