//! Phase operations
//!
//! Each phase wraps its collaborators, emits progress, records metrics and
//! returns its artifact. Phases never touch session state; the orchestrator
//! stores what they return.

mod designer;
mod explorer;
mod generator;
mod verifier;

pub use designer::Designer;
pub use explorer::Explorer;
pub use generator::Generator;
pub use verifier::Verifier;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Deserialize one field of a model response, defaulting when absent or malformed
fn field_or_default<T: DeserializeOwned + Default>(value: Option<&Value>, key: &str) -> T {
    value
        .and_then(|v| v.get(key))
        .cloned()
        .and_then(|field| serde_json::from_value(field).ok())
        .unwrap_or_default()
}

/// Deserialize a list field entry by entry, skipping entries that do not fit
///
/// `None` when the field is absent or null. A single object is read as a
/// one-entry list.
fn entries<T: DeserializeOwned>(value: Option<&Value>, key: &str) -> Option<Vec<T>> {
    let items = match value?.get(key)? {
        Value::Null => return None,
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    };
    let total = items.len();
    let kept: Vec<T> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if kept.len() < total {
        warn!("Skipped {} malformed {} entries", total - kept.len(), key);
    }
    Some(kept)
}

fn entries_or_default<T: DeserializeOwned>(value: Option<&Value>, key: &str) -> Vec<T> {
    entries(value, key).unwrap_or_default()
}

/// Like [`field_or_default`] but `None` when the field cannot be used
fn field<T: DeserializeOwned>(value: Option<&Value>, key: &str) -> Option<T> {
    value
        .and_then(|v| v.get(key))
        .cloned()
        .and_then(|field| serde_json::from_value(field).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagepilot_core::PageElement;
    use serde_json::json;

    #[test]
    fn test_field_helpers() {
        let value = json!({"elements": [{"id": "a"}], "count": "nope"});
        let elements: Vec<PageElement> = field_or_default(Some(&value), "elements");
        assert_eq!(elements[0].id, "a");

        let missing: Vec<PageElement> = field_or_default(Some(&value), "interactions");
        assert!(missing.is_empty());

        let bad: Option<u32> = field(Some(&value), "count");
        assert!(bad.is_none());

        let none: Vec<PageElement> = field_or_default(None, "elements");
        assert!(none.is_empty());
    }

    #[test]
    fn test_entries_skip_only_unusable_items() {
        let value = json!({
            "elements": [{"id": "a"}, "not an element", {"id": "b"}],
            "single": {"id": "c"},
            "empty": null
        });

        let elements: Vec<PageElement> = entries_or_default(Some(&value), "elements");
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].id, "b");

        let single: Vec<PageElement> = entries_or_default(Some(&value), "single");
        assert_eq!(single[0].id, "c");

        assert!(entries::<PageElement>(Some(&value), "empty").is_none());
        assert!(entries::<PageElement>(Some(&value), "missing").is_none());
    }
}
