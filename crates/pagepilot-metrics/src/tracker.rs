//! Per-phase token and timing metrics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;

/// Label of a recorded metrics entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricPhase {
    Exploration,
    Design,
    DesignRefinement,
    Generation,
    GenerationRefinement,
    VerificationAttempt,
    Verification,
}

impl MetricPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exploration => "exploration",
            Self::Design => "design",
            Self::DesignRefinement => "design_refinement",
            Self::Generation => "generation",
            Self::GenerationRefinement => "generation_refinement",
            Self::VerificationAttempt => "verification_attempt",
            Self::Verification => "verification",
        }
    }
}

impl std::fmt::Display for MetricPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded collaborator call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    pub phase: MetricPhase,
    pub token_count: u64,
    pub elapsed_seconds: f64,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate over the entries of one phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseMetrics {
    /// `None` when nothing has been recorded
    pub phase: Option<MetricPhase>,
    pub iterations: usize,
    pub total_tokens: u64,
    pub total_time: f64,
    pub avg_response_time: f64,
    pub tokens_per_iteration: f64,
}

/// Per-phase totals inside a [`MetricsSummary`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTotals {
    pub iterations: usize,
    pub total_tokens: u64,
    pub total_time: f64,
    pub avg_response_time: f64,
}

/// Whole-session aggregate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_iterations: usize,
    pub total_tokens: u64,
    /// Session uptime in seconds since creation or last reset
    pub total_time: f64,
    pub phases: BTreeMap<MetricPhase, PhaseTotals>,
}

/// Append-only metrics log
///
/// Entries are never mutated or removed except by [`MetricsTracker::reset`].
#[derive(Debug, Clone)]
pub struct MetricsTracker {
    entries: Vec<MetricEntry>,
    started_at: Instant,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            started_at: Instant::now(),
        }
    }

    /// Append an entry and return it for persistence
    pub fn record(&mut self, phase: MetricPhase, token_count: u64, elapsed_seconds: f64) -> MetricEntry {
        let entry = MetricEntry {
            phase,
            token_count,
            elapsed_seconds,
            timestamp: Utc::now(),
        };
        debug!(
            "Recorded {} metrics: {} tokens, {:.2}s",
            phase, token_count, elapsed_seconds
        );
        self.entries.push(entry.clone());
        entry
    }

    pub fn entries(&self) -> &[MetricEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Aggregate for the phase of the most recent entry
    pub fn current(&self) -> PhaseMetrics {
        match self.entries.last() {
            Some(latest) => self.phase(latest.phase),
            None => PhaseMetrics::default(),
        }
    }

    /// Aggregate for one phase
    pub fn phase(&self, phase: MetricPhase) -> PhaseMetrics {
        let matching: Vec<&MetricEntry> = self.entries.iter().filter(|e| e.phase == phase).collect();
        if matching.is_empty() {
            return PhaseMetrics::default();
        }

        let iterations = matching.len();
        let total_tokens: u64 = matching.iter().map(|e| e.token_count).sum();
        let total_time: f64 = matching.iter().map(|e| e.elapsed_seconds).sum();

        PhaseMetrics {
            phase: Some(phase),
            iterations,
            total_tokens,
            total_time: round2(total_time),
            avg_response_time: round2(total_time / iterations as f64),
            tokens_per_iteration: (total_tokens as f64 / iterations as f64).round(),
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let mut phases: BTreeMap<MetricPhase, PhaseTotals> = BTreeMap::new();
        for entry in &self.entries {
            let totals = phases.entry(entry.phase).or_default();
            totals.iterations += 1;
            totals.total_tokens += entry.token_count;
            totals.total_time += entry.elapsed_seconds;
        }

        for totals in phases.values_mut() {
            totals.avg_response_time = round2(totals.total_time / totals.iterations as f64);
            totals.total_time = round2(totals.total_time);
        }

        MetricsSummary {
            total_iterations: self.entries.len(),
            total_tokens: self.entries.iter().map(|e| e.token_count).sum(),
            total_time: round2(self.started_at.elapsed().as_secs_f64()),
            phases,
        }
    }

    /// Drop all entries and restart the uptime clock
    pub fn reset(&mut self) {
        self.entries.clear();
        self.started_at = Instant::now();
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
