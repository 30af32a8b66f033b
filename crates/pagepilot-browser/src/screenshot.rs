//! Screenshot evidence storage

use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::driver::BrowserDriver;
use pagepilot_core::{PilotError, Result};

/// Writes screenshots under the artifacts directory
#[derive(Debug, Clone)]
pub struct ScreenshotStore {
    base_dir: PathBuf,
}

impl ScreenshotStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Store PNG bytes as `{timestamp}-{name}.png` and return the path
    pub async fn store(&self, name: &str, data: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.base_dir).await.map_err(|e| {
            PilotError::Other(format!(
                "Failed to create artifact directory {}: {}",
                self.base_dir.display(),
                e
            ))
        })?;

        let timestamp = Utc::now().format("%Y%m%d-%H%M%S%3f");
        let filename = format!("{}-{}.png", timestamp, slug(name));
        let path = self.base_dir.join(filename);

        fs::write(&path, data).await?;
        info!("Screenshot stored: {} ({} bytes)", path.display(), data.len());
        Ok(path)
    }
}

/// Capture a full-page screenshot and store it
pub async fn capture_full_page(
    driver: &dyn BrowserDriver,
    store: &ScreenshotStore,
    name: &str,
) -> Result<PathBuf> {
    let data = driver.screenshot().await?;
    store.store(name, &data).await
}

/// Filesystem-safe name derived from a URL or label
fn slug(name: &str) -> String {
    let slug: String = name
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();

    let trimmed = slug.trim_matches('-');
    let mut out = String::new();
    for part in trimmed.split('-').filter(|p| !p.is_empty()) {
        if !out.is_empty() {
            out.push('-');
        }
        out.push_str(part);
    }

    if out.is_empty() {
        "page".to_string()
    } else {
        out.chars().take(60).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBrowser;
    use tempfile::TempDir;

    #[test]
    fn test_slug() {
        assert_eq!(slug("https://example.com/login?next=/"), "example-com-login-next");
        assert_eq!(slug("///"), "page");
        assert_eq!(slug(&"a".repeat(100)).len(), 60);
    }

    #[tokio::test]
    async fn test_capture_full_page_writes_png() {
        let dir = TempDir::new().unwrap();
        let store = ScreenshotStore::new(dir.path().join("artifacts"));
        let browser = MockBrowser::new("Home", "https://example.com");

        let path = capture_full_page(&browser, &store, "https://example.com")
            .await
            .unwrap();

        assert!(path.starts_with(dir.path().join("artifacts")));
        assert!(path.to_string_lossy().ends_with("-example-com.png"));
        let data = std::fs::read(&path).unwrap();
        assert_eq!(data, MockBrowser::SCREENSHOT_BYTES);
    }
}
