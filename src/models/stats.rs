// src/models/stats.rs

//! Counters for one crawl run.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Summary of a single crawl run, logged when the queue drains.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlStats {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Work items popped from the queue
    pub popped: usize,
    /// New snapshots committed
    pub added: usize,
    /// Changed snapshots committed
    pub updated: usize,
    /// Snapshots identical to the previous crawl
    pub unchanged: usize,
    /// Releases gone upstream (404)
    pub not_found: usize,
    /// Items given up on after retries or persistence failures
    pub failed: usize,
}

impl CrawlStats {
    /// Start a new stats window at the current time.
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            popped: 0,
            added: 0,
            updated: 0,
            unchanged: 0,
            not_found: 0,
            failed: 0,
        }
    }

    /// Close the stats window.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Elapsed wall-clock seconds, up to now if the run is still open.
    pub fn elapsed_secs(&self) -> i64 {
        self.finished_at
            .unwrap_or_else(Utc::now)
            .signed_duration_since(self.started_at)
            .num_seconds()
    }

    /// Log a one-line run summary.
    pub fn log_summary(&self) {
        log::info!(
            "processed {} items in {}s: {} added, {} updated, {} unchanged, {} not found, {} failed",
            self.popped,
            self.elapsed_secs(),
            self.added,
            self.updated,
            self.unchanged,
            self.not_found,
            self.failed
        );
    }
}
