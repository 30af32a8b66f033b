//! Gemini API client
//!
//! Each call is stateless: one prompt in, one completion out. No
//! conversation history is kept between calls.

use async_trait::async_trait;
use pagepilot_core::config::ProviderConfig;
use pagepilot_core::{PilotError, Result};
use std::time::{Duration, Instant};
use tracing::instrument;

use crate::auth;
use crate::provider::CompletionProvider;
use crate::types::{
    Completion, GeminiContent, GeminiPart, GeminiRequest, GeminiResponse, GenerationConfig,
};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

// Retry configuration for transient (5xx) failures
const INITIAL_BACKOFF_SECS: u64 = 2;
const MAX_BACKOFF_SECS: u64 = 30;

/// Completion provider backed by the Gemini `generateContent` endpoint
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_retries: u32,
    base_url: String,
}

impl GeminiClient {
    /// Create a client, reading the API key from the configured env var
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let api_key = auth::get_api_key(&config.api_key_env)?;
        Ok(Self::new(api_key, config))
    }

    pub fn new(api_key: impl Into<String>, config: &ProviderConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            base_url: GEMINI_API_BASE.to_string(),
        }
    }

    /// Override the API base URL (proxies, local fakes)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn request_body(&self, prompt: &str, max_tokens: usize) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: max_tokens,
                temperature: self.temperature,
            },
        }
    }
}

#[async_trait]
impl CompletionProvider for GeminiClient {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str, max_tokens: usize) -> Result<Completion> {
        let started = Instant::now();
        let request = self.request_body(prompt, max_tokens);

        let mut retries = 0;
        let mut backoff_secs = INITIAL_BACKOFF_SECS;

        loop {
            tracing::debug!("Sending request to Gemini API (attempt {})", retries + 1);

            let response = self
                .http
                .post(self.endpoint())
                .header("x-goog-api-key", &self.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| PilotError::Provider(format!("Failed to send request: {}", e)))?;

            let status = response.status();

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown".to_string());

                if status.as_u16() == 429 || is_exhaustion_message(&error_text) {
                    tracing::warn!("Provider reports exhausted capacity ({})", status);
                    return Err(PilotError::ProviderExhausted(format!(
                        "Gemini API {}: {}",
                        status, error_text
                    )));
                }

                if status.is_server_error() && retries < self.max_retries {
                    retries += 1;
                    tracing::warn!(
                        "Server error ({}). Waiting {} seconds before retry {}/{}",
                        status,
                        backoff_secs,
                        retries,
                        self.max_retries
                    );
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }

                return Err(PilotError::Provider(format!(
                    "Gemini API error {}: {}",
                    status, error_text
                )));
            }

            let body: GeminiResponse = response
                .json()
                .await
                .map_err(|e| PilotError::Provider(format!("Failed to parse response: {}", e)))?;

            return completion_from_response(&body, started.elapsed().as_secs_f64());
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Convert a successful response, treating zero billed tokens as exhaustion
fn completion_from_response(body: &GeminiResponse, elapsed_seconds: f64) -> Result<Completion> {
    let token_count = body.total_tokens();
    if token_count == 0 {
        return Err(PilotError::ProviderExhausted(
            "No tokens available from provider".to_string(),
        ));
    }

    let text = body.text();
    tracing::info!(
        "Completion received ({} chars, {} tokens, {:.2}s)",
        text.len(),
        token_count,
        elapsed_seconds
    );

    Ok(Completion {
        text,
        token_count,
        elapsed_seconds,
    })
}

fn is_exhaustion_message(text: &str) -> bool {
    text.contains("RESOURCE_EXHAUSTED") || text.to_lowercase().contains("quota")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_and_body() {
        let config = ProviderConfig::default();
        let client = GeminiClient::new("key", &config).with_base_url("http://localhost:9/models/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9/models/gemini-3-flash-preview:generateContent"
        );

        let body = serde_json::to_value(client.request_body("hello", 256)).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
    }

    #[test]
    fn test_zero_tokens_is_exhaustion() {
        let body: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": ""}]}}],
            "usageMetadata": {"totalTokenCount": 0}
        }))
        .unwrap();
        let err = completion_from_response(&body, 0.1).unwrap_err();
        assert!(err.is_provider_exhausted());
    }

    #[test]
    fn test_completion_from_response() {
        let body: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "{}"}]}}],
            "usageMetadata": {"totalTokenCount": 17}
        }))
        .unwrap();
        let completion = completion_from_response(&body, 0.5).unwrap();
        assert_eq!(completion.text, "{}");
        assert_eq!(completion.token_count, 17);
    }

    #[test]
    fn test_exhaustion_message_detection() {
        assert!(is_exhaustion_message("{\"status\": \"RESOURCE_EXHAUSTED\"}"));
        assert!(is_exhaustion_message("You exceeded your current Quota"));
        assert!(!is_exhaustion_message("invalid argument"));
    }

    #[test]
    fn test_from_config_without_key_fails() {
        let config = ProviderConfig {
            api_key_env: "PAGEPILOT_TEST_MISSING_KEY".to_string(),
            ..ProviderConfig::default()
        };
        let err = GeminiClient::from_config(&config).unwrap_err();
        assert!(matches!(err, PilotError::Auth(_)));
    }
}
