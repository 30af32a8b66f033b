//! Scripted browser for tests

use async_trait::async_trait;
use pagepilot_core::config::BrowserSettings;
use pagepilot_core::{PilotError, Result};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::driver::{BrowserDriver, BrowserLauncher};

/// In-memory page with a fixed title, URL and element list
#[derive(Debug, Clone)]
pub struct MockBrowser {
    title: String,
    url: String,
    elements: Vec<Value>,
    navigation_error: Option<String>,
    visited: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl MockBrowser {
    /// Bytes returned by [`BrowserDriver::screenshot`]
    pub const SCREENSHOT_BYTES: &'static [u8] = b"\x89PNG\r\n\x1a\nmock";

    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            elements: Vec::new(),
            navigation_error: None,
            visited: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_elements(mut self, elements: Vec<Value>) -> Self {
        self.elements = elements;
        self
    }

    /// Make every navigation fail with this message
    pub fn failing_navigation(mut self, message: impl Into<String>) -> Self {
        self.navigation_error = Some(message.into());
        self
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserDriver for MockBrowser {
    async fn navigate(&self, url: &str) -> Result<()> {
        if let Some(message) = &self.navigation_error {
            return Err(PilotError::Browser(format!(
                "Failed to navigate to {}: {}",
                url, message
            )));
        }
        if let Ok(mut visited) = self.visited.lock() {
            visited.push(url.to_string());
        }
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.title.clone())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self
            .visited
            .lock()
            .ok()
            .and_then(|v| v.last().cloned())
            .unwrap_or_else(|| self.url.clone()))
    }

    async fn evaluate(&self, _script: &str) -> Result<Value> {
        Ok(Value::String(serde_json::to_string(&self.elements)?))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(Self::SCREENSHOT_BYTES.to_vec())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Launcher that hands out clones of one [`MockBrowser`]
#[derive(Debug, Clone)]
pub struct MockLauncher {
    browser: MockBrowser,
    launches: Arc<AtomicUsize>,
}

impl MockLauncher {
    pub fn new(browser: MockBrowser) -> Self {
        Self {
            browser,
            launches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// The shared browser, for asserting on visits and close
    pub fn browser(&self) -> &MockBrowser {
        &self.browser
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    async fn launch(&self, _settings: &BrowserSettings) -> Result<Box<dyn BrowserDriver>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.browser.clone()))
    }
}
