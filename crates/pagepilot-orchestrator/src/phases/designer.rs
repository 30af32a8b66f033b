//! Test case design and refinement

use chrono::Utc;
use pagepilot_agent::{generate_json, CompletionProvider};
use pagepilot_core::{Coverage, PageKnowledge, Result, TestCase, TestCases};
use pagepilot_metrics::{MetricPhase, MetricsRecorder};
use std::sync::Arc;
use tracing::{info, warn};

use super::{entries, entries_or_default, field, field_or_default};
use crate::events::ProgressSink;
use crate::prompt::{build_design_prompt, build_design_refinement_prompt};

/// Turns page knowledge into designed test cases
pub struct Designer {
    provider: Arc<dyn CompletionProvider>,
    max_tokens: usize,
}

impl Designer {
    pub fn new(provider: Arc<dyn CompletionProvider>, max_tokens: usize) -> Self {
        Self { provider, max_tokens }
    }

    pub async fn design(
        &self,
        knowledge: &PageKnowledge,
        sink: &dyn ProgressSink,
        metrics: &mut MetricsRecorder,
    ) -> Result<TestCases> {
        sink.progress("Designing test cases from page knowledge...");
        let prompt = build_design_prompt(knowledge);
        let response = generate_json(self.provider.as_ref(), &prompt, self.max_tokens).await?;
        metrics
            .record(
                MetricPhase::Design,
                response.completion.token_count,
                response.completion.elapsed_seconds,
            )
            .await;

        let parsed = response.extraction.value();
        let cases = TestCases {
            cases: entries_or_default(parsed, "test_cases"),
            coverage: field_or_default(parsed, "coverage"),
            timestamp: Utc::now(),
        };

        info!("Designed {} test cases for {}", cases.len(), knowledge.url);
        sink.progress(&format!("Designed {} test cases", cases.len()));
        Ok(cases)
    }

    /// Revise existing cases from user feedback
    ///
    /// When the response cannot be parsed the current cases are kept.
    pub async fn refine(
        &self,
        current: &TestCases,
        feedback: &str,
        sink: &dyn ProgressSink,
        metrics: &mut MetricsRecorder,
    ) -> Result<TestCases> {
        sink.progress("Refining test cases based on feedback...");
        let prompt = build_design_refinement_prompt(current, feedback);
        let response = generate_json(self.provider.as_ref(), &prompt, self.max_tokens).await?;
        metrics
            .record(
                MetricPhase::DesignRefinement,
                response.completion.token_count,
                response.completion.elapsed_seconds,
            )
            .await;

        let parsed = response.extraction.value();
        if parsed.is_none() {
            warn!("Design refinement response was not parseable; keeping current cases");
        }

        let cases: Vec<TestCase> = entries(parsed, "test_cases").unwrap_or_else(|| current.cases.clone());
        let coverage: Coverage = field(parsed, "coverage").unwrap_or_else(|| current.coverage.clone());

        Ok(TestCases {
            cases,
            coverage,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use pagepilot_agent::MockProvider;
    use pagepilot_core::{DomSnapshot, PageStructure};

    fn knowledge() -> PageKnowledge {
        PageKnowledge {
            url: "https://example.com/login".to_string(),
            title: "Sign in".to_string(),
            elements: vec![],
            interactions: vec![],
            structure: PageStructure::default(),
            raw_dom: DomSnapshot::default(),
            screenshot: None,
            timestamp: Utc::now(),
        }
    }

    const DESIGN: &str = r##"{"test_cases": [
        {"id": "TC001", "name": "Valid login", "priority": "high", "category": "happy_path",
         "steps": [{"action": "type", "target": "#email", "data": "a@b.c", "expected": "filled"}]},
        {"id": "TC002", "name": "Empty submit", "priority": "medium", "category": "edge_case", "steps": []}
    ], "coverage": {"elements_covered": 2, "interaction_types": ["type", "click"], "edge_cases": ["empty form"]}}"##;

    #[tokio::test]
    async fn test_design_parses_cases() {
        let provider = MockProvider::new();
        provider.push_text(DESIGN, 900);
        let designer = Designer::new(Arc::new(provider.clone()), 2048);
        let mut metrics = MetricsRecorder::new();

        let cases = designer
            .design(&knowledge(), &RecordingSink::new(), &mut metrics)
            .await
            .unwrap();

        assert_eq!(cases.len(), 2);
        assert_eq!(cases.cases[0].steps[0].target, "#email");
        assert_eq!(cases.coverage.elements_covered, 2);
        assert_eq!(metrics.current().phase, Some(MetricPhase::Design));
        assert!(provider.prompts()[0].contains("Purpose: Unknown"));
    }

    #[tokio::test]
    async fn test_design_keeps_cases_with_string_steps() {
        let provider = MockProvider::new();
        provider.push_text(
            r#"{"test_cases": [
                {"id": "TC001", "name": "Title", "steps": [{"action": "navigate", "expected": "title"}]},
                {"id": "TC002", "steps": ["click the link", "see iana"]},
                "not a case"
            ]}"#,
            300,
        );
        let designer = Designer::new(Arc::new(provider), 2048);

        let cases = designer
            .design(&knowledge(), &RecordingSink::new(), &mut MetricsRecorder::new())
            .await
            .unwrap();

        assert_eq!(cases.len(), 2);
        assert_eq!(cases.cases[1].id, "TC002");
        assert_eq!(cases.cases[1].steps.len(), 2);
        assert_eq!(cases.cases[1].steps[0].action, "click the link");
    }

    #[tokio::test]
    async fn test_design_failure_yields_empty_cases() {
        let provider = MockProvider::new();
        provider.push_text("no json here", 10);
        let designer = Designer::new(Arc::new(provider), 2048);

        let cases = designer
            .design(&knowledge(), &RecordingSink::new(), &mut MetricsRecorder::new())
            .await
            .unwrap();

        assert!(cases.is_empty());
        assert_eq!(cases.coverage, Coverage::default());
    }

    #[tokio::test]
    async fn test_refine_keeps_current_on_parse_failure() {
        let provider = MockProvider::new();
        provider.push_text(DESIGN, 900);
        provider.push_text("I changed nothing, sorry", 30);
        let designer = Designer::new(Arc::new(provider.clone()), 2048);
        let mut metrics = MetricsRecorder::new();
        let sink = RecordingSink::new();

        let current = designer.design(&knowledge(), &sink, &mut metrics).await.unwrap();
        let refined = designer
            .refine(&current, "add a password reset case", &sink, &mut metrics)
            .await
            .unwrap();

        assert_eq!(refined.cases, current.cases);
        assert_eq!(refined.coverage, current.coverage);
        assert_eq!(metrics.current().phase, Some(MetricPhase::DesignRefinement));
        assert!(provider.prompts()[1].contains("add a password reset case"));
    }

    #[tokio::test]
    async fn test_refine_replaces_cases() {
        let provider = MockProvider::new();
        provider.push_text(
            r#"{"test_cases": [{"id": "TC009", "name": "Reset password"}]}"#,
            120,
        );
        let designer = Designer::new(Arc::new(provider), 2048);
        let current = TestCases {
            cases: vec![TestCase {
                id: "TC001".to_string(),
                ..TestCase::default()
            }],
            coverage: Coverage {
                elements_covered: 4,
                ..Coverage::default()
            },
            timestamp: Utc::now(),
        };

        let refined = designer
            .refine(&current, "focus on reset", &RecordingSink::new(), &mut MetricsRecorder::new())
            .await
            .unwrap();

        assert_eq!(refined.cases.len(), 1);
        assert_eq!(refined.cases[0].id, "TC009");
        // Coverage absent from the response falls back to the current one
        assert_eq!(refined.coverage.elements_covered, 4);
    }
}
