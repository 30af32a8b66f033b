//! Page exploration

use chrono::Utc;
use pagepilot_agent::{generate_json, CompletionProvider};
use pagepilot_browser::{capture_full_page, extract_dom, BrowserDriver, ScreenshotStore};
use pagepilot_core::fail_open::fail_open;
use pagepilot_core::{PageKnowledge, Result};
use pagepilot_metrics::{MetricPhase, MetricsRecorder};
use std::sync::Arc;
use tracing::info;

use super::{entries_or_default, field_or_default};
use crate::events::ProgressSink;
use crate::prompt::build_exploration_prompt;

/// Builds [`PageKnowledge`] from a live page
pub struct Explorer {
    provider: Arc<dyn CompletionProvider>,
    max_tokens: usize,
    screenshots: Option<ScreenshotStore>,
}

impl Explorer {
    pub fn new(provider: Arc<dyn CompletionProvider>, max_tokens: usize) -> Self {
        Self {
            provider,
            max_tokens,
            screenshots: None,
        }
    }

    /// Store a full-page screenshot for every exploration
    pub fn with_screenshots(mut self, store: ScreenshotStore) -> Self {
        self.screenshots = Some(store);
        self
    }

    pub async fn explore(
        &self,
        driver: &dyn BrowserDriver,
        url: &str,
        sink: &dyn ProgressSink,
        metrics: &mut MetricsRecorder,
    ) -> Result<PageKnowledge> {
        sink.progress(&format!("Navigating to {}...", url));
        driver.navigate(url).await?;

        sink.progress("Analyzing page structure...");
        let dom = extract_dom(driver).await?;

        let screenshot = match &self.screenshots {
            Some(store) => fail_open("screenshot capture", || capture_full_page(driver, store, url)).await,
            None => None,
        };

        sink.progress("Building knowledge base with AI...");
        let prompt = build_exploration_prompt(url, &dom);
        let analysis = generate_json(self.provider.as_ref(), &prompt, self.max_tokens).await?;
        metrics
            .record(
                MetricPhase::Exploration,
                analysis.completion.token_count,
                analysis.completion.elapsed_seconds,
            )
            .await;

        let parsed = analysis.extraction.value();
        let knowledge = PageKnowledge {
            url: url.to_string(),
            title: dom.title.clone(),
            elements: entries_or_default(parsed, "elements"),
            interactions: entries_or_default(parsed, "interactions"),
            structure: field_or_default(parsed, "structure"),
            raw_dom: dom,
            screenshot,
            timestamp: Utc::now(),
        };

        info!(
            "Explored {}: {} elements, {} interactions",
            url,
            knowledge.elements.len(),
            knowledge.interactions.len()
        );
        sink.progress(&format!("Found {} testable elements", knowledge.elements.len()));

        Ok(knowledge)
    }
}
