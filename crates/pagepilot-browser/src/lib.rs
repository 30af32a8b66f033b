//! Browser automation for pagepilot
//!
//! Exploration drives a real browser through the [`BrowserDriver`] seam:
//! navigate, read the title and URL, evaluate the DOM extraction script and
//! capture a full-page screenshot as evidence.
//!
//! # Modules
//!
//! - [`driver`]: the [`BrowserDriver`] and [`BrowserLauncher`] traits
//! - [`browser`]: headless Chrome implementation over the DevTools protocol
//! - [`dom`]: the page script that collects inputs, buttons, links and forms
//! - [`screenshot`]: screenshot capture into the artifacts directory
//! - [`mock`]: scripted driver for tests
//!
//! # Requirements
//!
//! - Chrome or Chromium installed for [`ChromeLauncher`]
//! - A display unless `browser.headless = true`

pub mod browser;
pub mod dom;
pub mod driver;
pub mod mock;
pub mod screenshot;

pub use browser::{ChromeLauncher, ChromeSession};
pub use dom::{extract_dom, DOM_EXTRACTION_SCRIPT};
pub use driver::{BrowserDriver, BrowserLauncher};
pub use mock::{MockBrowser, MockLauncher};
pub use screenshot::{capture_full_page, ScreenshotStore};
