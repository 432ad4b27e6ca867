//! Console progress display for batch runs

use crate::types::ArticleId;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Instant;

/// Per-run item counts
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunCounts {
    /// Items fetched and processed (successes plus failures)
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Items passed over because they had already completed
    pub skipped: u64,
    pub elapsed_seconds: f64,
    pub items_per_second: f64,
}

/// Progress display for a batch run
pub struct BatchProgress {
    /// Progress bar (None if running in quiet mode)
    progress_bar: Option<ProgressBar>,
    start_time: Instant,
    counts: RunCounts,
    /// Attempts between refreshes of the rate statistics
    refresh_interval: u64,
    stats_line: String,
}

impl BatchProgress {
    /// Create a display over `total` ids, `already_done` of which completed
    /// in earlier runs
    pub fn new(total: u64, already_done: u64, refresh_interval: u64, quiet: bool) -> Self {
        let progress_bar = if !quiet {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb.set_message(format!("{} already completed", already_done));
            Some(pb)
        } else {
            None
        };

        Self {
            progress_bar,
            start_time: Instant::now(),
            counts: RunCounts::default(),
            refresh_interval: refresh_interval.max(1),
            stats_line: String::new(),
        }
    }

    pub fn item_succeeded(&mut self, id: &ArticleId) {
        self.counts.attempted += 1;
        self.counts.succeeded += 1;
        self.advance(id, "ok");
    }

    pub fn item_failed(&mut self, id: &ArticleId) {
        self.counts.attempted += 1;
        self.counts.failed += 1;
        self.advance(id, "failed");
    }

    pub fn item_skipped(&mut self, id: &ArticleId) {
        self.counts.skipped += 1;
        self.advance(id, "skipped");
    }

    fn advance(&mut self, id: &ArticleId, status: &str) {
        if self.counts.attempted > 0 && self.counts.attempted % self.refresh_interval == 0 {
            let counts = self.counts();
            self.stats_line = format!(
                " | ok {} | failed {} | {:.1} items/s",
                counts.succeeded, counts.failed, counts.items_per_second
            );
        }

        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
            pb.set_message(format!("{} {}{}", id, status, self.stats_line));
        }
    }

    /// Print a line above the bar (no-op in quiet mode)
    pub fn println(&self, line: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.println(line);
        }
    }

    /// Current counts with the elapsed time and rate filled in
    pub fn counts(&self) -> RunCounts {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let items_per_second = if elapsed > 0.0 {
            self.counts.attempted as f64 / elapsed
        } else {
            0.0
        };

        RunCounts {
            elapsed_seconds: elapsed,
            items_per_second,
            ..self.counts.clone()
        }
    }

    /// Leave the bar on screen with a closing message
    pub fn abandon(&self, message: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.abandon_with_message(message.to_string());
        }
    }

    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            let counts = self.counts();
            pb.finish_with_message(format!(
                "Done! {} ok, {} failed, {} skipped, {:.1} items/s",
                counts.succeeded, counts.failed, counts.skipped, counts.items_per_second
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut progress = BatchProgress::new(10, 0, 10, true);

        progress.item_succeeded(&ArticleId::new("scp", 1));
        progress.item_failed(&ArticleId::new("scp", 2));
        progress.item_skipped(&ArticleId::new("scp", 3));
        progress.item_succeeded(&ArticleId::new("scp", 4));

        let counts = progress.counts();
        assert_eq!(counts.attempted, 3);
        assert_eq!(counts.succeeded, 2);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.skipped, 1);
    }

    #[test]
    fn test_stats_refresh_interval() {
        let mut progress = BatchProgress::new(10, 0, 2, true);

        progress.item_succeeded(&ArticleId::new("scp", 1));
        assert!(progress.stats_line.is_empty());

        progress.item_failed(&ArticleId::new("scp", 2));
        assert!(progress.stats_line.contains("ok 1 | failed 1"));
    }
}
