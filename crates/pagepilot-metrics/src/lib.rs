//! # pagepilot-metrics
//!
//! Observability for pagepilot sessions.
//!
//! This crate provides:
//! - An append-only log of per-phase token usage and response time
//! - Aggregation per phase and across the session
//! - JSON-lines persistence of recorded entries
//! - The single latest verification report, written atomically

mod recorder;
mod storage;
mod tracker;

pub use recorder::MetricsRecorder;
pub use storage::{MetricsStorage, ReportStore};
pub use tracker::{MetricEntry, MetricPhase, MetricsSummary, MetricsTracker, PhaseMetrics, PhaseTotals};
