//! Scripted completion provider for tests

use async_trait::async_trait;
use pagepilot_core::{PilotError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::provider::CompletionProvider;
use crate::types::Completion;

/// Mock provider that replays queued responses in order
///
/// Every prompt is recorded. When the queue runs dry the provider returns
/// `PilotError::Provider`, which makes unexpected extra calls visible.
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<Result<Completion>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn push_text(&self, text: impl Into<String>, token_count: u64) {
        self.push(Ok(Completion::new(text, token_count, 0.01)));
    }

    /// Queue a failure
    pub fn push_error(&self, error: PilotError) {
        self.push(Err(error));
    }

    pub fn push(&self, response: Result<Completion>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
    }

    /// Prompts received so far, in order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Replies still queued
    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn generate(&self, prompt: &str, _max_tokens: usize) -> Result<Completion> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let next = self
            .responses
            .lock()
            .map_err(|_| PilotError::Provider("mock provider lock poisoned".to_string()))?
            .pop_front();

        next.unwrap_or_else(|| {
            Err(PilotError::Provider(
                "No mock response queued".to_string(),
            ))
        })
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order() {
        let provider = MockProvider::new();
        provider.push_text("first", 1);
        provider.push_text("second", 2);

        assert_eq!(provider.generate("a", 10).await.unwrap().text, "first");
        assert_eq!(provider.generate("b", 10).await.unwrap().text, "second");
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.prompts(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_empty_queue_errors() {
        let provider = MockProvider::new();
        let err = provider.generate("a", 10).await.unwrap_err();
        assert!(matches!(err, PilotError::Provider(_)));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let provider = MockProvider::new();
        let handle = provider.clone();
        provider.push_text("x", 1);

        handle.generate("p", 10).await.unwrap();
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.remaining(), 0);
    }
}
