//! Completion provider seam
//!
//! Phases never talk to an HTTP API directly. They go through
//! [`CompletionProvider`] so tests can substitute [`crate::MockProvider`].

use async_trait::async_trait;
use pagepilot_core::Result;
use tracing::debug;

use crate::extract::extract_structured;
use crate::types::{Completion, StructuredCompletion};

/// Appended to every prompt that expects a JSON object back
pub const JSON_INSTRUCTION: &str = "\n\nIMPORTANT: Return ONLY a valid JSON object.";

/// Trait for language-model completion backends
///
/// Implementations must return `PilotError::ProviderExhausted` when the
/// backend reports no usable capacity (quota exhausted, zero tokens), so the
/// orchestrator can surface it as a distinct error kind.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate free text for a complete, self-contained prompt
    async fn generate(&self, prompt: &str, max_tokens: usize) -> Result<Completion>;

    /// Model identifier, for logs
    fn model_name(&self) -> &str;
}

/// Generate with the JSON instruction appended and recover a structured value
///
/// Extraction failure is not an error: the returned
/// [`StructuredCompletion::extraction`] carries the failure sentinel and the
/// caller picks its fallback. Provider errors still propagate.
pub async fn generate_json(
    provider: &dyn CompletionProvider,
    prompt: &str,
    max_tokens: usize,
) -> Result<StructuredCompletion> {
    let json_prompt = format!("{}{}", prompt, JSON_INSTRUCTION);
    let completion = provider.generate(&json_prompt, max_tokens).await?;
    let extraction = extract_structured(&completion.text);

    if !extraction.is_parsed() {
        debug!(
            "No structured result from {} ({} chars of output)",
            provider.model_name(),
            completion.text.len()
        );
    }

    Ok(StructuredCompletion {
        completion,
        extraction,
    })
}
