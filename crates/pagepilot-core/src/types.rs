//! Core type definitions for pagepilot sessions
//!
//! Artifacts produced by each phase. Shapes that come back from the language
//! model are deserialized leniently: missing fields default, and scalar/list
//! mismatches are coerced instead of rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Session phase
///
/// `Idle` is the only resting phase. Every other variant exists only while a
/// command handler is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Exploring,
    Designing,
    Generating,
    Verifying,
    Refining,
}

impl Phase {
    pub fn is_resting(&self) -> bool {
        matches!(self, Phase::Idle)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Exploring => write!(f, "exploring"),
            Self::Designing => write!(f, "designing"),
            Self::Generating => write!(f, "generating"),
            Self::Verifying => write!(f, "verifying"),
            Self::Refining => write!(f, "refining"),
        }
    }
}

/// Everything learned about a page during exploration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageKnowledge {
    pub url: String,
    pub title: String,
    pub elements: Vec<PageElement>,
    pub interactions: Vec<Interaction>,
    pub structure: PageStructure,
    pub raw_dom: DomSnapshot,
    /// Full-page screenshot stored during exploration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
    pub timestamp: DateTime<Utc>,
}

/// A testable element as described by the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageElement {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(deserialize_with = "lenient_string")]
    pub locator: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
}

/// A user interaction the page supports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interaction {
    #[serde(deserialize_with = "lenient_string")]
    pub action: String,
    #[serde(deserialize_with = "lenient_string")]
    pub target: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
}

/// Overall page purpose and flow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageStructure {
    #[serde(deserialize_with = "lenient_string")]
    pub purpose: String,
    #[serde(deserialize_with = "lenient_string")]
    pub main_flow: String,
    #[serde(deserialize_with = "lenient_strings")]
    pub test_priorities: Vec<String>,
}

/// Raw DOM facts collected by the page script, before any model analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomSnapshot {
    pub title: String,
    pub url: String,
    pub elements: Vec<Value>,
    pub element_count: usize,
}

/// Designed test cases plus coverage analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCases {
    #[serde(rename = "test_cases")]
    pub cases: Vec<TestCase>,
    pub coverage: Coverage,
    pub timestamp: DateTime<Utc>,
}

impl TestCases {
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestCase {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub priority: String,
    #[serde(deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(deserialize_with = "lenient_steps")]
    pub steps: Vec<TestStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestStep {
    #[serde(deserialize_with = "lenient_string")]
    pub action: String,
    #[serde(deserialize_with = "lenient_string")]
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(deserialize_with = "lenient_string")]
    pub expected: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coverage {
    #[serde(deserialize_with = "lenient_count")]
    pub elements_covered: u32,
    #[serde(deserialize_with = "lenient_strings")]
    pub interaction_types: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub edge_cases: Vec<String>,
}

/// Outcome of one execution of a generated test suite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Runner exit status was the conventional "all passed" value
    pub success: bool,
    pub passed: u32,
    pub failed: u32,
    pub errored: u32,
    #[serde(default)]
    pub skipped: u32,
    /// Per-test result lines and the summary line, without debug noise
    pub filtered_log: String,
    pub duration_seconds: f64,
    pub timestamp: DateTime<Utc>,
}

impl VerificationReport {
    /// Report for a run that could not be executed at all
    pub fn execution_error(message: impl std::fmt::Display, duration_seconds: f64) -> Self {
        Self {
            success: false,
            passed: 0,
            failed: 0,
            errored: 1,
            skipped: 0,
            filtered_log: format!("Execution error: {}", message),
            duration_seconds,
            timestamp: Utc::now(),
        }
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        format!(
            "{} passed, {} failed, {} errors in {:.2}s",
            self.passed, self.failed, self.errored, self.duration_seconds
        )
    }
}

/// Accept a string, number, bool or list where a string is expected
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_string(&Value::deserialize(deserializer)?))
}

/// Accept a list or a single scalar where a list of strings is expected
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().map(value_to_string).collect(),
        other => vec![value_to_string(&other)],
    })
}

/// Accept step objects or bare step descriptions; unusable entries are dropped
fn lenient_steps<'de, D>(deserializer: D) -> Result<Vec<TestStep>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => vec![other],
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(_) => serde_json::from_value(item).ok(),
            Value::Null => None,
            other => Some(TestStep {
                action: value_to_string(&other),
                ..TestStep::default()
            }),
        })
        .collect())
}

/// Accept a number, a numeric string, or a list (counted) where a count is expected
fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().unwrap_or(0) as u32,
        Value::String(s) => s.trim().parse().unwrap_or(0),
        Value::Array(items) => items.len() as u32,
        _ => 0,
    })
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(" -> "),
        other => other.to_string(),
    }
}
