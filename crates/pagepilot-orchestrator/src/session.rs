//! Session state
//!
//! One long-lived [`Session`] is owned by the orchestrator. Only command
//! handlers mutate it.

use pagepilot_core::{PageKnowledge, Phase, TestCases, VerificationReport};
use pagepilot_metrics::{MetricsRecorder, MetricsSummary};
use serde::{Deserialize, Serialize};

use crate::state_machine::Presence;

#[derive(Debug, Default)]
pub struct Session {
    pub phase: Phase,
    pub page_knowledge: Option<PageKnowledge>,
    pub test_cases: Option<TestCases>,
    pub generated_code: Option<String>,
    pub last_verification: Option<VerificationReport>,
    pub metrics: MetricsRecorder,
}

impl Session {
    pub fn new(metrics: MetricsRecorder) -> Self {
        Self {
            metrics,
            ..Self::default()
        }
    }

    pub fn presence(&self) -> Presence {
        Presence {
            page_knowledge: self.page_knowledge.is_some(),
            test_cases: self.test_cases.is_some(),
            generated_code: self.generated_code.is_some(),
        }
    }

    /// Drop every artifact and the in-memory metrics log
    pub fn clear(&mut self) {
        self.phase = Phase::Idle;
        self.page_knowledge = None;
        self.test_cases = None;
        self.generated_code = None;
        self.last_verification = None;
        self.metrics.reset();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            has_page_knowledge: self.page_knowledge.is_some(),
            test_case_count: self.test_cases.as_ref().map(TestCases::len),
            has_generated_code: self.generated_code.is_some(),
            last_success: self.last_verification.as_ref().map(|r| r.success),
            metrics: self.metrics.summary(),
        }
    }
}

/// Read-only view published after every command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub has_page_knowledge: bool,
    pub test_case_count: Option<usize>,
    pub has_generated_code: bool,
    pub last_success: Option<bool>,
    pub metrics: MetricsSummary,
}
