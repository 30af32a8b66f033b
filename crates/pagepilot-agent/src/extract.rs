//! Structured response extraction
//!
//! Models asked for a JSON object still wrap it in prose, markdown fences,
//! smart quotes or trailing commas. [`extract_structured`] runs an ordered
//! fallback chain and returns the first value that parses:
//!
//! 1. take the interior of a ```json fence, else of any fence, else the full text
//! 2. drop everything before the first `{` or `[`
//! 3. balanced-delimiter scan to the point where depth returns to zero
//! 4. trim to the last matching closing delimiter
//! 5. heuristic repair (smart quotes, single quotes, trailing commas)
//!
//! The balanced scan is not string-literal aware: a brace inside a quoted
//! value counts as structural. Stages 4 and 5 cover most of what that misses.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

use crate::types::Extraction;

/// Maximum characters kept in a failure preview
pub const PREVIEW_CHARS: usize = 1000;

static TRAILING_COMMA_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").unwrap());

/// Recover a structured value from free-form model output
///
/// Never fails past this boundary: an unrecoverable input yields
/// [`Extraction::Failed`] carrying a bounded preview.
pub fn extract_structured(text: &str) -> Extraction {
    let fenced = fenced_interior(text);

    let Some(start) = fenced.find(|c| c == '{' || c == '[') else {
        debug!("No JSON delimiter found in {} chars of output", text.len());
        return failed(fenced);
    };
    let candidate = &fenced[start..];
    let (open, close) = if candidate.starts_with('{') {
        ('{', '}')
    } else {
        ('[', ']')
    };

    if let Some(span) = balanced_span(candidate, open, close) {
        if let Ok(value) = serde_json::from_str::<Value>(span) {
            return Extraction::Parsed(value);
        }
    }

    let trimmed = trim_to_last_close(candidate, close);
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        debug!("Recovered JSON after tail trim");
        return Extraction::Parsed(value);
    }

    let repaired = repair(trimmed);
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        debug!("Recovered JSON after heuristic repair");
        return Extraction::Parsed(value);
    }

    debug!("JSON extraction failed after all fallbacks");
    failed(candidate)
}

/// Interior of the preferred fenced block, or the whole text
fn fenced_interior(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        return until_fence_close(&text[start + "```json".len()..]);
    }

    if let Some(start) = text.find("```") {
        let rest = &text[start + 3..];
        // Skip a language tag on the opening fence line
        let body = match rest.find('\n') {
            Some(newline) if !rest[..newline].contains(['{', '[']) => &rest[newline + 1..],
            _ => rest,
        };
        return until_fence_close(body);
    }

    text
}

fn until_fence_close(body: &str) -> &str {
    match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    }
}

/// Span from the opening delimiter up to where depth first returns to zero
fn balanced_span(candidate: &str, open: char, close: char) -> Option<&str> {
    let mut depth: usize = 0;

    for (i, ch) in candidate.char_indices() {
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(&candidate[..i + ch.len_utf8()]);
            }
        }
    }

    None
}

fn trim_to_last_close(candidate: &str, close: char) -> &str {
    match candidate.rfind(close) {
        Some(end) => &candidate[..end + close.len_utf8()],
        None => candidate,
    }
}

fn repair(candidate: &str) -> String {
    let mut text: String = candidate
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
            other => other,
        })
        .collect();

    // Only when no double quotes exist; otherwise apostrophes inside
    // valid strings would be corrupted.
    if !text.contains('"') {
        text = text.replace('\'', "\"");
    }

    TRAILING_COMMA_REGEX.replace_all(&text, "$1").into_owned()
}

fn failed(candidate: &str) -> Extraction {
    Extraction::Failed {
        preview: candidate.chars().take(PREVIEW_CHARS).collect(),
    }
}
