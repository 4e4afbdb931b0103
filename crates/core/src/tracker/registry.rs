//! Async registry reconciling browser-side downloads with filesystem state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::probe::StorageProbe;

/// Configuration for download completion tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Give up on a download after this long (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// How often to probe for the file (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_timeout() -> u64 {
    60
}

fn default_poll_interval() -> u64 {
    1000
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

/// Terminal state of a tracked download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// File observed on durable storage.
    Completed,
    /// Deadline elapsed before the file appeared.
    TimedOut,
}

/// Resolved outcome of one tracked download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResult {
    /// Filename the browser announced.
    pub filename: String,
    /// Where the file was expected to land.
    pub path: PathBuf,
    /// How the task settled.
    pub status: DownloadStatus,
    /// When tracking started.
    pub started_at: DateTime<Utc>,
}

/// Registry of in-flight browser downloads.
///
/// Each tracked file runs an independent polling task; tasks are
/// fire-and-forget relative to the sequential workflow and only joined
/// once, at the end of a batch. Every task settles exactly once.
pub struct DownloadTracker {
    probe: Arc<dyn StorageProbe>,
    dest_dir: PathBuf,
    config: TrackerConfig,
    pending: Vec<JoinHandle<DownloadResult>>,
}

impl DownloadTracker {
    /// Create a tracker watching `dest_dir`.
    pub fn new(probe: Arc<dyn StorageProbe>, dest_dir: impl Into<PathBuf>, config: TrackerConfig) -> Self {
        Self {
            probe,
            dest_dir: dest_dir.into(),
            config,
            pending: Vec::new(),
        }
    }

    /// Number of downloads not yet joined.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Start tracking a file expected to appear in the destination
    /// directory.
    pub fn track(&mut self, filename: impl Into<String>) {
        let filename = filename.into();
        let path = self.dest_dir.join(&filename);
        let probe = Arc::clone(&self.probe);
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        info!("Tracking download: {}", filename);
        let handle = tokio::spawn(async move {
            let started_at = Utc::now();
            let deadline = tokio::time::Instant::now() + timeout;
            let status = loop {
                tokio::time::sleep(interval).await;
                // Existence is checked before the deadline so a file that
                // arrives on the final tick still counts as completed.
                if probe.exists(&path) {
                    break DownloadStatus::Completed;
                }
                if tokio::time::Instant::now() >= deadline {
                    break DownloadStatus::TimedOut;
                }
            };

            match status {
                DownloadStatus::Completed => info!("Download completed: {}", filename),
                DownloadStatus::TimedOut => {
                    warn!(
                        "Download did not appear within {}s: {}",
                        timeout.as_secs(),
                        filename
                    );
                }
            }

            DownloadResult {
                filename,
                path,
                status,
                started_at,
            }
        });
        self.pending.push(handle);
    }

    /// Resolve every outstanding download.
    ///
    /// Called once at batch end; individual timeouts are reported in the
    /// results, never escalated.
    pub async fn join_all(&mut self) -> Vec<DownloadResult> {
        let handles = std::mem::take(&mut self.pending);
        let mut results = Vec::with_capacity(handles.len());
        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => warn!("Download tracking task failed: {}", e),
            }
        }
        results
    }
}
