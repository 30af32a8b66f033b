//! Metrics and report persistence

use pagepilot_core::{PilotError, Result, VerificationReport};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::tracker::MetricEntry;

/// Append-only JSON-lines metrics file
#[derive(Debug, Clone)]
pub struct MetricsStorage {
    path: PathBuf,
}

impl MetricsStorage {
    pub fn append_file(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a single line
    pub async fn store(&self, entry: &MetricEntry) -> Result<()> {
        let line = serde_json::to_string(entry)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;

        debug!("Stored {} metrics to {:?}", entry.phase, self.path);
        Ok(())
    }

    /// Load every parseable entry; malformed lines are skipped
    pub async fn load_all(&self) -> Result<Vec<MetricEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        let mut entries = Vec::new();

        for line in content.lines() {
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<MetricEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    debug!("Failed to parse metrics line: {}", e);
                }
            }
        }

        Ok(entries)
    }
}

/// Single-slot store for the latest verification report
///
/// Writes go to a temporary file in the same directory and are renamed into
/// place, so readers see either the previous report or the new one.
#[derive(Debug, Clone)]
pub struct ReportStore {
    path: PathBuf,
}

impl ReportStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn save(&self, report: &VerificationReport) -> Result<()> {
        let content = serde_json::to_vec_pretty(report)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&path, &content))
            .await
            .map_err(|e| PilotError::Other(format!("Report write task failed: {}", e)))??;

        debug!("Latest report written to {:?}", self.path);
        Ok(())
    }

    /// `None` when no report has been written yet
    pub async fn load(&self) -> Result<Option<VerificationReport>> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| PilotError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{MetricPhase, MetricsTracker};
    use chrono::Utc;
    use tempfile::tempdir;

    fn report(passed: u32, success: bool) -> VerificationReport {
        VerificationReport {
            success,
            passed,
            failed: 0,
            errored: 0,
            skipped: 0,
            filtered_log: format!("{} passed in 0.10s", passed),
            duration_seconds: 0.1,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_append_file_storage() {
        let dir = tempdir().unwrap();
        let storage = MetricsStorage::append_file(dir.path().join("nested").join("metrics.jsonl"));

        let mut tracker = MetricsTracker::new();
        storage
            .store(&tracker.record(MetricPhase::Exploration, 10, 1.0))
            .await
            .unwrap();
        storage
            .store(&tracker.record(MetricPhase::Design, 20, 2.0))
            .await
            .unwrap();

        let all = storage.load_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].phase, MetricPhase::Design);
    }

    #[tokio::test]
    async fn test_load_all_skips_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.jsonl");
        std::fs::write(&path, "not json\n\n").unwrap();

        let storage = MetricsStorage::append_file(&path);
        assert!(storage.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_report_missing_is_none() {
        let dir = tempdir().unwrap();
        let store = ReportStore::new(dir.path().join("latest.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_report_overwrite() {
        let dir = tempdir().unwrap();
        let store = ReportStore::new(dir.path().join("data").join("latest.json"));

        store.save(&report(1, false)).await.unwrap();
        store.save(&report(4, true)).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.passed, 4);
        assert!(loaded.success);

        // No temporary files left beside the report
        let names: Vec<_> = std::fs::read_dir(dir.path().join("data"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }
}
