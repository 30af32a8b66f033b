//! # pagepilot-core
//!
//! Core types for the pagepilot test-authoring loop.
//!
//! pagepilot turns a live web page into a verified test suite in four phases:
//! explore the page, design test cases, generate executable test code, and
//! verify it by running it. This crate holds what every other crate shares:
//!
//! - Session artifacts (page knowledge, test cases, verification reports)
//! - The unified [`PilotError`] type
//! - Repository-level configuration ([`PilotConfig`])
//! - Fail-open helpers for infrastructure side effects

pub mod config;
mod error;
pub mod fail_open;
mod types;

pub use config::PilotConfig;
pub use error::{PilotError, Result};
pub use types::*;
