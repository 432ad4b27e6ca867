//! Resumable batch conversion
//!
//! The driver walks an ordinal range in ascending order. Each id is either
//! skipped (already completed) or run through fetch, extract, write; the
//! outcome is recorded in the [`ProgressTracker`] before the next id starts.
//!
//! ```text
//!   INIT ──► ITERATING ──► DONE
//!                │
//!                ├──► ABORTED (consecutive failures reached the limit)
//!                └──► ABORTED (cancel flag set between items)
//! ```

mod output;
mod progress;

pub use output::{OutputError, OutputLayout, ShardLayout, OVERFLOW_SHARD};
pub use progress::{BatchProgress, RunCounts};

use crate::archive::ArchiveReader;
use crate::config::BatchConfig;
use crate::extract::{ContentExtractor, ExtractError, ExtractorConfig};
use crate::tracker::{ProgressTracker, TrackerError};
use crate::types::{id_range, ArticleId};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Why a single item failed. Caught at the item boundary and recorded; never
/// aborts the run on its own.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("content fetch failed: {0}")]
    ContentFetchFailed(String),

    #[error("content region not found")]
    ContentRegionMissing,

    #[error("image fetch failed for {path}: {reason}")]
    ImageFetchFailed { path: String, reason: String },

    #[error("output write failed: {0}")]
    OutputWriteFailed(#[from] OutputError),
}

impl ItemError {
    /// Stable label stored in failure details
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ContentFetchFailed(_) => "content_fetch_failed",
            Self::ContentRegionMissing => "content_region_missing",
            Self::ImageFetchFailed { .. } => "image_fetch_failed",
            Self::OutputWriteFailed(_) => "output_write_failed",
        }
    }
}

impl From<ExtractError> for ItemError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::ContentRegionMissing => Self::ContentRegionMissing,
        }
    }
}

/// Errors that end a run
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange { start: u64, end: u64 },

    #[error("configuration error: {0}")]
    Config(String),
}

/// What a successful item produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuccessDetails {
    pub images_found: usize,
    pub images_successful: usize,
    pub images_failed: usize,
    pub output_file: PathBuf,
    pub shard_dir: String,
    pub tags_count: usize,
    pub content_length: usize,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every id in the range was visited
    Completed,
    /// Stopped after too many failures in a row
    CircuitBroken,
    /// Stopped by the cancel flag
    Interrupted,
}

/// Result of [`BatchDriver::run`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// First ordinal actually visited (after resume)
    pub start: u64,
    pub end: u64,
    pub counts: RunCounts,
}

/// Sequential batch driver
pub struct BatchDriver<A: ArchiveReader> {
    archive: A,
    extractor: ContentExtractor,
    tracker: ProgressTracker,
    output: OutputLayout,
    config: BatchConfig,
    cancelled: Arc<AtomicBool>,
    quiet: bool,
}

impl<A: ArchiveReader> BatchDriver<A> {
    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    pub fn into_tracker(self) -> ProgressTracker {
        self.tracker
    }

    pub fn output(&self) -> &OutputLayout {
        &self.output
    }

    /// Flag checked between items; setting it stops the run
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Process `start..=end`, optionally resuming past completed work.
    ///
    /// Per-item failures are recorded and counted toward the circuit
    /// breaker. Only tracker write failures end the run with an error.
    pub fn run(&mut self, start: u64, end: u64, resume: bool) -> Result<RunReport, BatchError> {
        if start > end {
            return Err(BatchError::InvalidRange { start, end });
        }

        self.tracker.start_session()?;

        let effective_start = if resume {
            let resume_point = self.tracker.resume_point();
            if resume_point > start {
                info!(
                    "Resuming from {} (requested start {})",
                    resume_point, start
                );
            }
            start.max(resume_point)
        } else {
            start
        };

        if effective_start > end {
            info!(
                "Nothing to do: resume point {} is past the end of the range {}",
                effective_start, end
            );
            self.tracker.save()?;
            return Ok(RunReport {
                outcome: RunOutcome::Completed,
                start: effective_start,
                end,
                counts: RunCounts::default(),
            });
        }

        let total = end - effective_start + 1;
        let already_done = self.tracker.completed_in_range(effective_start, end) as u64;
        info!(
            "Processing {}-{} to {}-{} ({} ids, {} already completed)",
            self.config.prefix, effective_start, self.config.prefix, end, total, already_done
        );

        let mut progress =
            BatchProgress::new(total, already_done, self.config.refresh_interval, self.quiet);
        let mut consecutive_failures: u32 = 0;
        let mut outcome = RunOutcome::Completed;

        let prefix = self.config.prefix.clone();
        for id in id_range(&prefix, effective_start, end) {
            if self.is_cancelled() {
                warn!("Interrupted before {}", id);
                outcome = RunOutcome::Interrupted;
                break;
            }

            if self.tracker.should_skip(&id) {
                debug!("Skipping completed {}", id);
                self.tracker.record_skip();
                progress.item_skipped(&id);
                continue;
            }

            self.tracker.set_last_processed(id.ordinal());

            if self.process_and_record(&id)? {
                consecutive_failures = 0;
                progress.item_succeeded(&id);
            } else {
                consecutive_failures += 1;
                progress.item_failed(&id);

                if consecutive_failures >= self.config.max_consecutive_failures {
                    error!(
                        "Circuit breaker: {} consecutive failures, stopping after {}",
                        consecutive_failures, id
                    );
                    outcome = RunOutcome::CircuitBroken;
                    break;
                }
            }

            let attempted = progress.counts().attempted;
            if attempted % self.config.summary_interval.max(1) == 0 {
                for line in self.tracker.summary_lines() {
                    info!("{}", line);
                    progress.println(&line);
                }
            }
        }

        // Flush pending skip counts with the final state
        self.tracker.save()?;

        match outcome {
            RunOutcome::Completed => progress.finish(),
            RunOutcome::CircuitBroken => progress.abandon("Stopped: too many consecutive failures"),
            RunOutcome::Interrupted => progress.abandon("Interrupted"),
        }
        self.tracker.log_summary();

        Ok(RunReport {
            outcome,
            start: effective_start,
            end,
            counts: progress.counts(),
        })
    }

    /// Process one id outside the range loop. Returns whether it succeeded;
    /// an id that already completed is skipped and counts as success.
    pub fn process_single(&mut self, id: &ArticleId) -> Result<bool, BatchError> {
        if self.tracker.should_skip(id) {
            info!("[SKIP] {} already completed", id);
            return Ok(true);
        }

        self.tracker.start_session()?;
        self.tracker.set_last_processed(id.ordinal());
        let ok = self.process_and_record(id)?;
        self.tracker.log_summary();
        Ok(ok)
    }

    /// Run the item pipeline and record its outcome
    fn process_and_record(&mut self, id: &ArticleId) -> Result<bool, BatchError> {
        match self.process_item(id) {
            Ok(details) => {
                let details = serde_json::to_value(&details).ok();
                self.tracker.record_success(id, details)?;
                Ok(true)
            }
            Err(e) => {
                let details = serde_json::json!({ "kind": e.kind() });
                self.tracker.record_failure(id, &e.to_string(), Some(details))?;
                Ok(false)
            }
        }
    }

    /// Fetch, extract, and write one article with its images
    fn process_item(&self, id: &ArticleId) -> Result<SuccessDetails, ItemError> {
        let html = self
            .archive
            .fetch_article(id)
            .map_err(|e| ItemError::ContentFetchFailed(e.to_string()))?;

        if html.trim().is_empty() {
            return Err(ItemError::ContentFetchFailed("empty content".to_string()));
        }

        let content = self.extractor.extract(&html)?;
        let output_file = self.output.write_article(id, &content.to_artifact())?;
        debug!("Wrote {}", output_file.display());

        let images_found = content.image_references.len();
        let mut images_successful = 0;
        for reference in &content.image_references {
            match self.save_image(reference) {
                Ok(path) => {
                    debug!("Saved image {}", path.display());
                    images_successful += 1;
                }
                Err(e) => warn!("{}: {}", id, e),
            }
        }

        Ok(SuccessDetails {
            images_found,
            images_successful,
            images_failed: images_found - images_successful,
            output_file,
            shard_dir: self.output.shard_for(id),
            tags_count: content.tags.len(),
            content_length: content.markdown.len(),
        })
    }

    fn save_image(&self, reference: &str) -> Result<PathBuf, ItemError> {
        // Check the destination before touching the archive
        self.output.image_path(reference)?;

        let bytes = self
            .archive
            .fetch_image(reference)
            .map_err(|e| ItemError::ImageFetchFailed {
                path: reference.to_string(),
                reason: e.to_string(),
            })?;

        Ok(self.output.write_image(reference, &bytes)?)
    }
}

/// Builder for [`BatchDriver`]
pub struct BatchDriverBuilder<A: ArchiveReader> {
    archive: A,
    tracker: ProgressTracker,
    output_root: PathBuf,
    shards: ShardLayout,
    config: BatchConfig,
    extractor: Option<ContentExtractor>,
    cancelled: Option<Arc<AtomicBool>>,
    quiet: bool,
}

impl<A: ArchiveReader> BatchDriverBuilder<A> {
    pub fn new(archive: A, tracker: ProgressTracker, output_root: impl Into<PathBuf>) -> Self {
        Self {
            archive,
            tracker,
            output_root: output_root.into(),
            shards: ShardLayout::default(),
            config: BatchConfig::default(),
            extractor: None,
            cancelled: None,
            quiet: false,
        }
    }

    /// Set batch configuration
    pub fn with_config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_shards(mut self, shards: ShardLayout) -> Self {
        self.shards = shards;
        self
    }

    /// Use a custom extractor instead of one built from the batch config
    pub fn with_extractor(mut self, extractor: ContentExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Share an existing cancel flag
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(flag);
        self
    }

    /// Set quiet mode (no progress bar)
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn build(self) -> Result<BatchDriver<A>, BatchError> {
        if self.config.max_consecutive_failures == 0 {
            return Err(BatchError::Config(
                "max_consecutive_failures must be positive".into(),
            ));
        }
        if self.config.prefix.is_empty() {
            return Err(BatchError::Config("prefix must not be empty".into()));
        }

        let extractor = self.extractor.unwrap_or_else(|| {
            ContentExtractor::new(ExtractorConfig {
                image_policy: self.config.image_policy,
                extra_denylist: self.config.extra_denylist.clone(),
                ..Default::default()
            })
        });

        Ok(BatchDriver {
            archive: self.archive,
            extractor,
            tracker: self.tracker,
            output: OutputLayout::new(self.output_root, self.shards),
            config: self.config,
            cancelled: self.cancelled.unwrap_or_default(),
            quiet: self.quiet,
        })
    }
}
