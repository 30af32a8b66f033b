//! Execution report parsing
//!
//! Turns the combined stdout/stderr of a pytest run into a
//! [`VerificationReport`]. Counts come from the final summary line when it
//! is present and from per-test result markers otherwise. Success is taken
//! from the exit status alone: a run that crashes before collecting any test
//! has no failures to count but still did not pass.

use chrono::Utc;
use pagepilot_core::VerificationReport;
use regex::Regex;
use std::sync::LazyLock;

static RESULT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(PASSED|FAILED|ERROR)\b").unwrap());

/// pytest's short test summary: `FAILED path::test - message`
static SHORT_SUMMARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(PASSED|FAILED|ERROR)\s").unwrap());

static SUMMARY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+ (passed|failed|errors?|skipped)\b.*\bin [\d.]+s").unwrap());

static PASSED_COUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+) passed\b").unwrap());
static FAILED_COUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+) failed\b").unwrap());
static ERROR_COUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+) errors?\b").unwrap());
static SKIPPED_COUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+) skipped\b").unwrap());

/// Exit status pytest uses when every collected test passed
pub const EXIT_ALL_PASSED: i32 = 0;

/// Build a report from raw runner output
///
/// `exit_code` is `None` when the process was killed by a signal.
pub fn parse_report(raw: &str, exit_code: Option<i32>, duration_seconds: f64) -> VerificationReport {
    let kept: Vec<&str> = raw
        .lines()
        .filter(|line| RESULT_MARKER.is_match(line) || SUMMARY_LINE.is_match(line))
        .collect();

    // Per-test lines only, for the fallback counts
    let markers: Vec<&str> = kept
        .iter()
        .filter(|line| !SUMMARY_LINE.is_match(line) && !SHORT_SUMMARY.is_match(line))
        .filter_map(|line| RESULT_MARKER.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();

    let marker_count = |token: &str| markers.iter().filter(|m| **m == token).count() as u32;

    VerificationReport {
        success: exit_code == Some(EXIT_ALL_PASSED),
        passed: last_count(&PASSED_COUNT, raw).unwrap_or_else(|| marker_count("PASSED")),
        failed: last_count(&FAILED_COUNT, raw).unwrap_or_else(|| marker_count("FAILED")),
        errored: last_count(&ERROR_COUNT, raw).unwrap_or_else(|| marker_count("ERROR")),
        skipped: last_count(&SKIPPED_COUNT, raw).unwrap_or(0),
        filtered_log: kept.join("\n"),
        duration_seconds,
        timestamp: Utc::now(),
    }
}

/// Number captured by the last match, which is the summary line in pytest output
fn last_count(pattern: &Regex, raw: &str) -> Option<u32> {
    pattern
        .captures_iter(raw)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
