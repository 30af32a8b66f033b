//! Test code generation and refinement

use async_trait::async_trait;
use pagepilot_agent::{extract_code, CompletionProvider};
use pagepilot_core::{PageKnowledge, Result, TestCases};
use pagepilot_metrics::{MetricPhase, MetricsRecorder};
use std::sync::Arc;
use tracing::info;

use crate::events::ProgressSink;
use crate::loop_engine::CodeRefiner;
use crate::prompt::{build_code_refinement_prompt, build_generation_prompt};

/// Writes pytest + Playwright code for designed test cases
pub struct Generator {
    provider: Arc<dyn CompletionProvider>,
    max_tokens: usize,
}

impl Generator {
    pub fn new(provider: Arc<dyn CompletionProvider>, max_tokens: usize) -> Self {
        Self { provider, max_tokens }
    }

    pub async fn generate(
        &self,
        knowledge: &PageKnowledge,
        cases: &TestCases,
        sink: &dyn ProgressSink,
        metrics: &mut MetricsRecorder,
    ) -> Result<String> {
        sink.progress(&format!("Generating test code for {} test cases...", cases.len()));
        let prompt = build_generation_prompt(knowledge, cases);
        let completion = self.provider.generate(&prompt, self.max_tokens).await?;
        metrics
            .record(
                MetricPhase::Generation,
                completion.token_count,
                completion.elapsed_seconds,
            )
            .await;

        let code = extract_code(&completion.text);
        info!("Generated {} lines of test code", code.lines().count());
        Ok(code)
    }
}

#[async_trait]
impl CodeRefiner for Generator {
    async fn refine_code(
        &self,
        code: &str,
        issue: &str,
        sink: &dyn ProgressSink,
        metrics: &mut MetricsRecorder,
    ) -> Result<String> {
        sink.progress("Refining code to fix issues...");
        let prompt = build_code_refinement_prompt(code, issue);
        let completion = self.provider.generate(&prompt, self.max_tokens).await?;
        metrics
            .record(
                MetricPhase::GenerationRefinement,
                completion.token_count,
                completion.elapsed_seconds,
            )
            .await;

        Ok(extract_code(&completion.text))
    }
}
