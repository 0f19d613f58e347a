//! # Progress Reporter
//!
//! Folds submission records into a [`RunSummary`]: counts by outcome, elapsed time and
//! an ETA of `elapsed / processed * remaining`. Observer only; the scheduler never
//! reads it to make decisions.

use crate::models::{SubmissionOutcome, SubmissionRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// Aggregate counts for a run or a single batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub submitted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total_tiles: usize,
    pub elapsed_ms: u64,
    pub eta_ms: Option<u64>,
}

impl RunSummary {
    /// Fold a record log. Derivable at any time, so never stored authoritatively.
    pub fn from_records(records: &[SubmissionRecord], total_tiles: usize, elapsed: Duration) -> Self {
        let mut summary = Self {
            total_tiles,
            ..Self::default()
        };
        for record in records {
            summary.count(record.outcome());
        }
        summary.with_elapsed(elapsed)
    }

    fn count(&mut self, outcome: SubmissionOutcome) {
        match outcome {
            SubmissionOutcome::Submitted => self.submitted += 1,
            SubmissionOutcome::SkippedExists => self.skipped += 1,
            SubmissionOutcome::Failed => self.failed += 1,
        }
    }

    fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = elapsed.as_millis() as u64;
        let processed = self.processed() as u128;
        self.eta_ms = (processed > 0).then(|| {
            let eta = u128::from(self.elapsed_ms) * self.remaining() as u128 / processed;
            u64::try_from(eta).unwrap_or(u64::MAX)
        });
        self
    }

    pub fn processed(&self) -> usize {
        self.submitted + self.skipped + self.failed
    }

    pub fn remaining(&self) -> usize {
        self.total_tiles.saturating_sub(self.processed())
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    pub fn eta(&self) -> Option<Duration> {
        self.eta_ms.map(Duration::from_millis)
    }

    pub fn percent_complete(&self) -> f64 {
        if self.total_tiles == 0 {
            return 100.0;
        }
        self.processed() as f64 * 100.0 / self.total_tiles as f64
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} processed ({:.1}%): {} submitted, {} skipped, {} failed",
            self.processed(),
            self.total_tiles,
            self.percent_complete(),
            self.submitted,
            self.skipped,
            self.failed
        )?;
        if let Some(eta) = self.eta() {
            let secs = eta.as_secs();
            write!(f, ", ETA {}h{:02}m{:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)?;
        }
        Ok(())
    }
}

/// Incremental progress aggregation for one run
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    started_at: Instant,
    summary: RunSummary,
}

impl ProgressReporter {
    pub fn new(total_tiles: usize) -> Self {
        Self {
            started_at: Instant::now(),
            summary: RunSummary {
                total_tiles,
                ..RunSummary::default()
            },
        }
    }

    /// Account for one record and return the updated summary.
    pub fn observe(&mut self, record: &SubmissionRecord) -> RunSummary {
        self.summary.count(record.outcome());
        let summary = self.summary();
        info!(
            tile_id = record.tile_identifier(),
            outcome = %record.outcome(),
            processed = summary.processed(),
            total = summary.total_tiles,
            eta_secs = summary.eta().map(|d| d.as_secs()),
            "{summary}"
        );
        summary
    }

    /// Current summary with elapsed time measured now
    pub fn summary(&self) -> RunSummary {
        self.summary.with_elapsed(self.started_at.elapsed())
    }
}
