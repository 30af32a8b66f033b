//! # pagepilot-agent
//!
//! Language-model collaborator for pagepilot.
//!
//! - [`CompletionProvider`]: the seam every phase generates content through
//! - [`GeminiClient`]: HTTP implementation against the Gemini API
//! - [`extract_structured`]: recovers a JSON value from unreliable model text
//! - [`extract_code`]: pulls a source file out of a fenced reply
//! - [`MockProvider`]: scripted provider for tests
//!
//! Every call is stateless. Phases build a complete prompt each time and
//! nothing is carried between calls.

mod auth;
mod client;
mod code;
mod extract;
mod mock;
mod provider;
mod types;

pub use auth::get_api_key;
pub use client::GeminiClient;
pub use code::extract_code;
pub use extract::{extract_structured, PREVIEW_CHARS};
pub use mock::MockProvider;
pub use provider::{generate_json, CompletionProvider, JSON_INSTRUCTION};
pub use types::*;
