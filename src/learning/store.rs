use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::types::{FailurePattern, FailureRecord};
use crate::config::StoreConfig;
use crate::error::{Result, TriageError};

const FAILURES_FILE: &str = "failures.jsonl";
const PATTERNS_FILE: &str = "patterns.json";

/// File-backed failure history (JSONL, append-only) and pattern snapshot.
pub struct FailureStore {
    dir: PathBuf,
    retention_days: i64,
}

impl FailureStore {
    pub fn new(dir: impl Into<PathBuf>, retention_days: i64) -> Self {
        Self {
            dir: dir.into(),
            retention_days,
        }
    }

    pub fn from_config(data_dir: &Path, config: &StoreConfig) -> Self {
        Self::new(data_dir.join("learning"), config.retention_days)
    }

    pub fn failures_path(&self) -> PathBuf {
        self.dir.join(FAILURES_FILE)
    }

    pub fn patterns_path(&self) -> PathBuf {
        self.dir.join(PATTERNS_FILE)
    }

    /// Oldest timestamp kept. `None` when the window reaches past the
    /// representable range, in which case nothing expires.
    fn cutoff(&self) -> Option<DateTime<Utc>> {
        TimeDelta::try_days(self.retention_days).and_then(|d| Utc::now().checked_sub_signed(d))
    }

    async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    fn to_line(record: &FailureRecord) -> Result<String> {
        serde_json::to_string(record)
            .map_err(|e| TriageError::Store(format!("JSON serialize failed: {}", e)))
    }

    pub async fn append_failure(&self, record: &FailureRecord) -> Result<()> {
        self.ensure_dir().await?;
        let line = Self::to_line(record)?;

        let path = self.failures_path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        file.write_all(format!("{}\n", line).as_bytes()).await?;
        file.flush().await?;

        debug!(path = %path.display(), failure_id = %record.id, "Appended failure record");
        Ok(())
    }

    /// Records within the retention window. Unreadable lines are skipped.
    pub async fn load_failures(&self) -> Result<Vec<FailureRecord>> {
        let path = self.failures_path();
        if !fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).await?;
        let cutoff = self.cutoff();

        let records: Vec<FailureRecord> = content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<FailureRecord>(line) {
                Ok(record) if cutoff.is_none_or(|c| record.timestamp >= c) => Some(record),
                Ok(_) => None,
                Err(e) => {
                    warn!(line = %line, error = %e, "Skipping invalid failure line");
                    None
                }
            })
            .collect();

        debug!(count = records.len(), path = %path.display(), "Loaded failure history");
        Ok(records)
    }

    /// Rewrite the history with the given records, e.g. after fixes were recorded.
    pub async fn rewrite_failures(&self, records: &[FailureRecord]) -> Result<()> {
        self.ensure_dir().await?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.failures_path())
            .await?;

        for record in records {
            let line = Self::to_line(record)?;
            file.write_all(format!("{}\n", line).as_bytes()).await?;
        }
        file.flush().await?;
        Ok(())
    }

    /// Drop expired and unreadable lines. Returns how many were removed.
    pub async fn compact(&self) -> Result<usize> {
        let path = self.failures_path();
        if !fs::try_exists(&path).await? {
            return Ok(0);
        }

        let content = fs::read_to_string(&path).await?;
        let all_lines: Vec<_> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        let original_count = all_lines.len();

        let cutoff = self.cutoff();
        let kept: Vec<FailureRecord> = all_lines
            .into_iter()
            .filter_map(|line| serde_json::from_str::<FailureRecord>(line).ok())
            .filter(|r| cutoff.is_none_or(|c| r.timestamp >= c))
            .collect();

        if kept.len() == original_count {
            return Ok(0);
        }

        self.rewrite_failures(&kept).await?;
        let removed = original_count - kept.len();
        debug!(removed, "Compacted failure history");
        Ok(removed)
    }

    pub async fn save_patterns(&self, patterns: &[FailurePattern]) -> Result<()> {
        self.ensure_dir().await?;
        let content = serde_json::to_string_pretty(patterns)
            .map_err(|e| TriageError::Store(format!("JSON serialize failed: {}", e)))?;
        fs::write(self.patterns_path(), content).await?;
        debug!(count = patterns.len(), "Saved failure patterns");
        Ok(())
    }

    pub async fn load_patterns(&self) -> Result<Vec<FailurePattern>> {
        let path = self.patterns_path();
        if !fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).await?;
        let patterns: Vec<FailurePattern> = serde_json::from_str(&content)?;
        debug!(count = patterns.len(), path = %path.display(), "Loaded failure patterns");
        Ok(patterns)
    }
}
