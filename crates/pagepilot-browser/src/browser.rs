//! Browser lifecycle management using Chrome DevTools Protocol
//!
//! `headless_chrome` is synchronous. Every call runs on the blocking pool so
//! the runtime thread stays free for the transport and other clients.

use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use pagepilot_core::config::BrowserSettings;
use pagepilot_core::{PilotError, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::driver::{BrowserDriver, BrowserLauncher};

/// Active browser session with one tab
pub struct ChromeSession {
    /// Kept alive for the tab's lifetime; dropping it kills the process
    #[allow(dead_code)]
    browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Launch a new browser instance
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let settings = settings.clone();
        tokio::task::spawn_blocking(move || Self::launch_blocking(&settings))
            .await
            .map_err(|e| PilotError::Browser(format!("Browser launch task failed: {}", e)))?
    }

    fn launch_blocking(settings: &BrowserSettings) -> Result<Self> {
        info!(
            "Launching browser (headless: {}, size: {}x{})",
            settings.headless, settings.window_width, settings.window_height
        );

        let launch_options = LaunchOptions::default_builder()
            .headless(settings.headless)
            .window_size(Some((settings.window_width, settings.window_height)))
            .build()
            .map_err(|e| PilotError::Browser(format!("Invalid launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| PilotError::Browser(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| PilotError::Browser(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(Duration::from_secs(settings.timeout_seconds));

        info!("Browser launched successfully");
        Ok(Self { browser, tab })
    }

    /// Run a synchronous tab operation on the blocking pool
    async fn with_tab<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Tab) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || f(&tab))
            .await
            .map_err(|e| PilotError::Browser(format!("Browser task failed: {}", e)))?
    }
}

#[async_trait]
impl BrowserDriver for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);
        let url = url.to_string();

        self.with_tab(move |tab| {
            tab.navigate_to(&url)
                .map_err(|e| PilotError::Browser(format!("Failed to navigate to {}: {}", url, e)))?;
            tab.wait_until_navigated()
                .map_err(|e| PilotError::Browser(format!("Navigation timeout for {}: {}", url, e)))?;
            info!("Successfully navigated to {}", url);
            Ok(())
        })
        .await
    }

    async fn title(&self) -> Result<String> {
        self.with_tab(|tab| {
            tab.get_title()
                .map_err(|e| PilotError::Browser(format!("Failed to read title: {}", e)))
        })
        .await
    }

    async fn current_url(&self) -> Result<String> {
        self.with_tab(|tab| Ok(tab.get_url())).await
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        debug!("Evaluating script ({} chars)", script.len());
        let script = script.to_string();

        self.with_tab(move |tab| {
            let result = tab
                .evaluate(&script, false)
                .map_err(|e| PilotError::Browser(format!("JavaScript evaluation failed: {}", e)))?;
            Ok(result.value.unwrap_or(Value::Null))
        })
        .await
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.with_tab(|tab| {
            tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
                .map_err(|e| PilotError::Browser(format!("CDP capture failed: {}", e)))
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        info!("Closing browser session");
        self.with_tab(|tab| {
            tab.close(true)
                .map(|_| ())
                .map_err(|e| PilotError::Browser(format!("Failed to close tab: {}", e)))
        })
        .await
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        debug!("ChromeSession dropped, browser will be cleaned up");
    }
}

/// Launches local Chrome/Chromium
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeLauncher;

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self, settings: &BrowserSettings) -> Result<Box<dyn BrowserDriver>> {
        let session = ChromeSession::launch(settings).await?;
        Ok(Box::new(session))
    }
}
