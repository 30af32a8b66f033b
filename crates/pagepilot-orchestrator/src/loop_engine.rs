//! Self-correction loop
//!
//! Run the generated code, and while it fails and budget remains, hand the
//! filtered failure log back to the model for a rewrite. With a budget of N
//! rounds there are at most N executions and N-1 refinements.

use async_trait::async_trait;
use pagepilot_core::{Result, VerificationReport};
use pagepilot_metrics::{MetricPhase, MetricsRecorder};
use tracing::{info, warn};

use crate::events::ProgressSink;
use crate::runner::{execute_attempt, TestRunner};

/// Issue text used when a failed run left no usable log
const EMPTY_LOG_ISSUE: &str = "Tests failed during execution";

/// Produces a corrected code artifact from a failure description
#[async_trait]
pub trait CodeRefiner: Send + Sync {
    async fn refine_code(
        &self,
        code: &str,
        issue: &str,
        sink: &dyn ProgressSink,
        metrics: &mut MetricsRecorder,
    ) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Passed,
    BudgetExhausted,
}

/// Final state of one loop run
#[derive(Debug, Clone)]
pub struct CorrectionOutcome {
    /// Latest code artifact, whether or not it passed
    pub code: String,
    /// Report of the last execution
    pub report: VerificationReport,
    pub attempts: usize,
    pub refinements: usize,
    pub stop_reason: StopReason,
}

pub struct CorrectionLoop<'a> {
    runner: &'a dyn TestRunner,
    refiner: &'a dyn CodeRefiner,
    sink: &'a dyn ProgressSink,
    max_rounds: usize,
}

impl<'a> CorrectionLoop<'a> {
    /// A budget of zero is treated as one round
    pub fn new(
        runner: &'a dyn TestRunner,
        refiner: &'a dyn CodeRefiner,
        sink: &'a dyn ProgressSink,
        max_rounds: usize,
    ) -> Self {
        Self {
            runner,
            refiner,
            sink,
            max_rounds: max_rounds.max(1),
        }
    }

    /// Refinement errors (provider exhaustion included) abort the loop
    pub async fn run(&self, code: String, metrics: &mut MetricsRecorder) -> Result<CorrectionOutcome> {
        let mut code = code;
        let mut refinements = 0;
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.sink.progress(&format!(
                "Verifying generated tests (attempt {}/{})...",
                attempt, self.max_rounds
            ));

            let report = execute_attempt(self.runner, &code).await;
            metrics
                .record(MetricPhase::VerificationAttempt, 0, report.duration_seconds)
                .await;

            if report.success {
                info!("Generated tests passed on attempt {}", attempt);
                self.sink.progress("Generated tests passed verification.");
                return Ok(CorrectionOutcome {
                    code,
                    report,
                    attempts: attempt,
                    refinements,
                    stop_reason: StopReason::Passed,
                });
            }

            if attempt == self.max_rounds {
                warn!(
                    "Generated tests still failing after {} attempts: {}",
                    attempt,
                    report.summary()
                );
                self.sink
                    .progress("Reached max refinement attempts; returning latest code.");
                return Ok(CorrectionOutcome {
                    code,
                    report,
                    attempts: attempt,
                    refinements,
                    stop_reason: StopReason::BudgetExhausted,
                });
            }

            let issue = if report.filtered_log.trim().is_empty() {
                EMPTY_LOG_ISSUE.to_string()
            } else {
                report.filtered_log.clone()
            };

            self.sink.progress(&format!(
                "Verification failed (attempt {}). Refining code...",
                attempt
            ));
            code = self.refiner.refine_code(&code, &issue, self.sink, metrics).await?;
            refinements += 1;
            self.sink.progress(&format!(
                "Refinement {} complete; re-running tests...",
                refinements
            ));
        }
    }
}
