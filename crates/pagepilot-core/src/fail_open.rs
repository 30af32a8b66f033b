//! Fail-open utilities for graceful degradation
//!
//! Infrastructure side effects (metrics persistence, screenshot artifacts,
//! the latest-report side file) must never fail the phase that produced them.
//! These helpers log the failure with `tracing::warn!` and return `None`.
//!
//! DO NOT use fail-open for:
//! - Content generation (the phase's own work)
//! - Test execution (its failures become reports instead)
//! - Precondition checks

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Execute an async operation that should fail open
///
/// # Usage
///
/// ```no_run
/// use pagepilot_core::fail_open::fail_open;
/// use pagepilot_core::Result;
///
/// async fn store_screenshot() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     let stored = fail_open("screenshot", || store_screenshot()).await;
///     // stored is None if store_screenshot() failed
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}
