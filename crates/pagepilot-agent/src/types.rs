//! Type definitions for provider interactions

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of one text completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text
    pub text: String,
    /// Total tokens billed for the call (prompt + output)
    pub token_count: u64,
    /// Wall-clock time spent in the call
    pub elapsed_seconds: f64,
}

impl Completion {
    pub fn new(text: impl Into<String>, token_count: u64, elapsed_seconds: f64) -> Self {
        Self {
            text: text.into(),
            token_count,
            elapsed_seconds,
        }
    }
}

/// Outcome of recovering a structured value from model text
///
/// Failure is a value, not an error: callers fall back to an empty or
/// previous artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Parsed(Value),
    /// No stage produced valid JSON. `preview` holds the start of the best
    /// candidate substring for diagnostics.
    Failed { preview: String },
}

impl Extraction {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Extraction::Parsed(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Extraction::Parsed(value) => Some(value),
            Extraction::Failed { .. } => None,
        }
    }
}

/// A completion together with its structured extraction
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredCompletion {
    pub completion: Completion,
    pub extraction: Extraction,
}

impl StructuredCompletion {
    /// Field of the parsed object, if both exist
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.extraction.value().and_then(|v| v.get(key))
    }
}

/// Gemini `generateContent` request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_output_tokens: usize,
    pub temperature: f32,
}

/// Gemini `generateContent` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    pub fn total_tokens(&self) -> u64 {
        self.usage_metadata
            .as_ref()
            .map(|u| u.total_token_count)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u64,
    #[serde(default)]
    pub candidates_token_count: u64,
    #[serde(default)]
    pub total_token_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some("hi".to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: 100,
                temperature: 0.5,
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 100);
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
    }

    #[test]
    fn test_response_text_and_tokens() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [{"text": "Hello "}, {"text": "world"}], "role": "model"},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 6}
        }))
        .unwrap();
        assert_eq!(response.text(), "Hello world");
        assert_eq!(response.total_tokens(), 6);
    }

    #[test]
    fn test_empty_response() {
        let response: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(response.text(), "");
        assert_eq!(response.total_tokens(), 0);
    }

    #[test]
    fn test_extraction_accessors() {
        let parsed = Extraction::Parsed(json!({"a": 1}));
        assert!(parsed.is_parsed());
        assert_eq!(parsed.value().unwrap()["a"], 1);

        let failed = Extraction::Failed {
            preview: "nope".to_string(),
        };
        assert!(failed.value().is_none());
    }
}
