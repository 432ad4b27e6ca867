//! Durable progress tracking for batch runs
//!
//! The tracker owns two JSON files in its state directory:
//! - `processing_status.json`: counters, completed and failed id sets, the
//!   current session
//! - `failed_items.json`: one failure record per failed id
//!
//! Every outcome is written through to disk before the call returns, so a
//! crash loses at most the item that was in flight.

mod state;

pub use state::{FailureRecord, ProcessingState, SessionStats};

use crate::types::ArticleId;
use chrono::Local;
use serde::Serialize;
use state::{load_json_or_default, write_json_atomic};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Status file name
pub const STATUS_FILE: &str = "processing_status.json";
/// Failure detail file name
pub const FAILURES_FILE: &str = "failed_items.json";

/// Errors raised while persisting tracker state
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Snapshot of tracker counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerStatistics {
    pub total_processed: u64,
    pub successful: u64,
    pub failed: u64,
    pub skipped: u64,
    /// Percentage of processed items that succeeded
    pub success_rate: f64,
    pub current_session: SessionStats,
    pub failed_items_count: usize,
}

/// Tracks completed and failed ids across runs
pub struct ProgressTracker {
    status_path: PathBuf,
    failures_path: PathBuf,
    state: ProcessingState,
    /// Index over `state.completed_items`
    completed: HashSet<String>,
    failures: Vec<FailureRecord>,
}

impl ProgressTracker {
    /// Open the tracker files in `state_dir`, creating the directory if
    /// needed. Missing or corrupt files start from an empty state.
    pub fn open(state_dir: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let state_dir = state_dir.as_ref();
        std::fs::create_dir_all(state_dir)?;

        let status_path = state_dir.join(STATUS_FILE);
        let failures_path = state_dir.join(FAILURES_FILE);

        let mut state: ProcessingState = load_json_or_default(&status_path);
        let removed = state.normalize();
        if removed > 0 {
            warn!("Dropped {} duplicate or superseded ids from tracker state", removed);
        }

        let completed: HashSet<String> = state.completed_items.iter().cloned().collect();

        let mut failures: Vec<FailureRecord> = load_json_or_default(&failures_path);
        failures.retain(|record| !completed.contains(&record.scp_id));

        info!(
            "Tracker loaded from {}: {} completed, {} failed",
            state_dir.display(),
            state.completed_items.len(),
            state.failed_items.len()
        );

        Ok(Self {
            status_path,
            failures_path,
            state,
            completed,
            failures,
        })
    }

    pub fn state(&self) -> &ProcessingState {
        &self.state
    }

    pub fn status_path(&self) -> &Path {
        &self.status_path
    }

    pub fn failures_path(&self) -> &Path {
        &self.failures_path
    }

    /// Failure records, one per failed id
    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    pub fn failure(&self, id: &ArticleId) -> Option<&FailureRecord> {
        let key = id.to_string();
        self.failures.iter().find(|r| r.scp_id == key)
    }

    /// True iff the id has completed successfully
    pub fn should_skip(&self, id: &ArticleId) -> bool {
        self.completed.contains(&id.to_string())
    }

    pub fn is_failed(&self, id: &ArticleId) -> bool {
        let key = id.to_string();
        self.state.failed_items.iter().any(|f| *f == key)
    }

    /// Number of completed ids whose ordinal lies in `start..=end`
    pub fn completed_in_range(&self, start: u64, end: u64) -> usize {
        self.completed_ordinals()
            .filter(|n| (start..=end).contains(n))
            .count()
    }

    /// Next ordinal after the highest completed one, or 1 when nothing has
    /// completed. Ids that do not parse are ignored.
    pub fn resume_point(&self) -> u64 {
        self.completed_ordinals()
            .max()
            .map(|max| max + 1)
            .unwrap_or(1)
    }

    fn completed_ordinals(&self) -> impl Iterator<Item = u64> + '_ {
        self.state
            .completed_items
            .iter()
            .filter_map(|id| ArticleId::parse(id).ok())
            .map(|id| id.ordinal())
    }

    /// Reset session counters and stamp the run time
    pub fn start_session(&mut self) -> Result<(), TrackerError> {
        let now = Local::now().naive_local();
        self.state.current_session = SessionStats {
            start_time: Some(now),
            ..Default::default()
        };
        self.state.last_run = Some(now);

        info!("Starting new processing session");
        self.save()
    }

    /// Remember the ordinal being attempted; written with the next outcome
    pub fn set_last_processed(&mut self, ordinal: u64) {
        self.state.last_processed_num = Some(ordinal);
    }

    /// Count a skip decision; flushed with the next write
    pub fn record_skip(&mut self) {
        self.state.skipped += 1;
    }

    /// Record a successful item.
    ///
    /// Counters increase on every call, including repeats for an id that
    /// has already completed; the completed set never holds an id twice.
    /// A previous failure for the id is cleared.
    pub fn record_success(
        &mut self,
        id: &ArticleId,
        details: Option<serde_json::Value>,
    ) -> Result<(), TrackerError> {
        let key = id.to_string();

        if self.completed.insert(key.clone()) {
            self.state.completed_items.push(key.clone());
        }

        self.state.successful += 1;
        self.state.total_processed += 1;
        self.state.current_session.successful += 1;
        self.state.current_session.processed += 1;

        if let Some(pos) = self.state.failed_items.iter().position(|f| *f == key) {
            self.state.failed_items.remove(pos);
            self.state.failed = self.state.failed.saturating_sub(1);

            let before = self.failures.len();
            self.failures.retain(|r| r.scp_id != key);
            if self.failures.len() != before {
                write_json_atomic(&self.failures_path, &self.failures)?;
            }
            debug!("Cleared previous failure for {}", key);
        }

        info!("[SUCCESS] {}", key);
        if let Some(details) = &details {
            info!("   details: {}", details);
        }

        self.save()
    }

    /// Record a failed item.
    ///
    /// The failure record for the id is replaced, not appended. The failed
    /// counter counts distinct ids; processed counters increase on every
    /// call. An id that already completed stays completed and never joins
    /// the failed set.
    pub fn record_failure(
        &mut self,
        id: &ArticleId,
        error: &str,
        details: Option<serde_json::Value>,
    ) -> Result<(), TrackerError> {
        let key = id.to_string();

        let record = FailureRecord {
            scp_id: key.clone(),
            error: error.to_string(),
            timestamp: Local::now().naive_local(),
            details: details.clone(),
        };

        match self.failures.iter_mut().find(|r| r.scp_id == key) {
            Some(existing) => *existing = record,
            None => self.failures.push(record),
        }
        write_json_atomic(&self.failures_path, &self.failures)?;

        if self.completed.contains(&key) {
            warn!("{} already completed, keeping it out of the failed set", key);
        } else if !self.state.failed_items.contains(&key) {
            self.state.failed_items.push(key.clone());
            self.state.failed += 1;
        }

        self.state.total_processed += 1;
        self.state.current_session.failed += 1;
        self.state.current_session.processed += 1;

        error!("[FAILED] {} - {}", key, error);
        if let Some(details) = &details {
            error!("   details: {}", details);
        }

        self.save()
    }

    /// Write the full state to the status file
    pub fn save(&self) -> Result<(), TrackerError> {
        write_json_atomic(&self.status_path, &self.state).map_err(|e| {
            error!("Failed to save tracker state to {}: {}", self.status_path.display(), e);
            e
        })
    }

    pub fn statistics(&self) -> TrackerStatistics {
        let success_rate =
            self.state.successful as f64 / self.state.total_processed.max(1) as f64 * 100.0;

        TrackerStatistics {
            total_processed: self.state.total_processed,
            successful: self.state.successful,
            failed: self.state.failed,
            skipped: self.state.skipped,
            success_rate,
            current_session: self.state.current_session.clone(),
            failed_items_count: self.state.failed_items.len(),
        }
    }

    /// Human-readable summary block
    pub fn summary_lines(&self) -> Vec<String> {
        let stats = self.statistics();
        let rule = "=".repeat(50);

        vec![
            rule.clone(),
            "Processing summary:".to_string(),
            format!("Total processed: {}", stats.total_processed),
            format!("Successful: {}", stats.successful),
            format!("Failed: {}", stats.failed),
            format!("Skipped: {}", stats.skipped),
            format!("Success rate: {:.2}%", stats.success_rate),
            format!("Session processed: {}", stats.current_session.processed),
            format!("Session successful: {}", stats.current_session.successful),
            format!("Session failed: {}", stats.current_session.failed),
            rule,
        ]
    }

    /// Log the summary block
    pub fn log_summary(&self) {
        for line in self.summary_lines() {
            info!("{}", line);
        }
    }
}
