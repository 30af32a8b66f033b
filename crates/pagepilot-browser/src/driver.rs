//! Automation driver seam

use async_trait::async_trait;
use pagepilot_core::config::BrowserSettings;
use pagepilot_core::Result;
use serde_json::Value;

/// One open page in a controlled browser
///
/// Every method is a suspension point for the calling task.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate and wait for the load to finish
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn title(&self) -> Result<String>;

    /// URL after redirects
    async fn current_url(&self) -> Result<String>;

    /// Evaluate a JavaScript expression and return its value
    async fn evaluate(&self, script: &str) -> Result<Value>;

    /// Full-page PNG screenshot
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Release the page. The driver must not be used afterwards.
    async fn close(&self) -> Result<()>;
}

/// Starts browsers on demand
///
/// The session launches lazily on the first exploration and keeps the driver
/// until reset.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, settings: &BrowserSettings) -> Result<Box<dyn BrowserDriver>>;
}
