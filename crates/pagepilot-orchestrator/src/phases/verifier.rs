//! Standalone verification of the current code artifact

use pagepilot_core::VerificationReport;
use pagepilot_metrics::{MetricPhase, MetricsRecorder};
use std::sync::Arc;

use crate::events::ProgressSink;
use crate::runner::{execute_attempt, TestRunner};

/// Runs generated code once and reports the outcome
pub struct Verifier {
    runner: Arc<dyn TestRunner>,
}

impl Verifier {
    pub fn new(runner: Arc<dyn TestRunner>) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &dyn TestRunner {
        self.runner.as_ref()
    }

    /// Execution problems are reported as a failed report, never as an error
    pub async fn verify(
        &self,
        code: &str,
        sink: &dyn ProgressSink,
        metrics: &mut MetricsRecorder,
    ) -> VerificationReport {
        sink.progress("Setting up test environment...");
        sink.progress("Running tests...");
        let report = execute_attempt(self.runner.as_ref(), code).await;
        metrics
            .record(MetricPhase::Verification, 0, report.duration_seconds)
            .await;

        sink.progress(&format!(
            "Tests completed: {} passed, {} failed",
            report.passed, report.failed
        ));
        report
    }
}
