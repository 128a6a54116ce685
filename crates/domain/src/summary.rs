use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::InactivityCutoff;

/// Counters produced by one cleanup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Devices deleted, or that would have been deleted in a dry run.
    pub succeeded: u64,
    /// Devices whose deletion failed.
    pub failed: u64,
    /// Devices already absent when the delete was attempted.
    pub skipped: u64,
    /// Candidates returned by the directory listing.
    pub considered_total: u64,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Creates an empty summary for a candidate set of the given size.
    #[must_use]
    pub fn for_candidates(considered_total: usize) -> Self {
        Self {
            considered_total: u64::try_from(considered_total).unwrap_or(u64::MAX),
            ..Self::default()
        }
    }

    /// Returns the number of candidates with a recorded outcome.
    #[must_use]
    pub fn processed(&self) -> u64 {
        self.succeeded
            .saturating_add(self.failed)
            .saturating_add(self.skipped)
    }

    /// Returns the number of candidates without a recorded outcome.
    ///
    /// Covers declined confirmations and items left over after an
    /// interruption or threshold abort.
    #[must_use]
    pub fn unprocessed(&self) -> u64 {
        self.considered_total.saturating_sub(self.processed())
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "succeeded={} failed={} skipped={} considered={} elapsed={:.1}s",
            self.succeeded,
            self.failed,
            self.skipped,
            self.considered_total,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Terminal state of a cleanup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Listing returned no candidates.
    NothingToDelete,
    /// The threshold gate stopped the run before any deletion.
    ThresholdExceeded {
        /// Candidate count returned by the listing.
        candidates: u64,
        /// Configured gate limit.
        threshold: u32,
    },
    /// Every candidate was visited.
    Completed,
    /// The caller cancelled the run part way through the delete loop.
    Interrupted,
}

impl RunOutcome {
    /// Returns stable outcome value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NothingToDelete => "nothing_to_delete",
            Self::ThresholdExceeded { .. } => "threshold_exceeded",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }
}

/// Result of one cleanup run as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Operation identifier used for progress tracking.
    pub run_id: String,
    /// Inactivity cutoff the candidates were selected with.
    pub cutoff: InactivityCutoff,
    /// Terminal state.
    pub outcome: RunOutcome,
    /// Outcome counters.
    pub summary: RunSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processed_counts_every_recorded_outcome() {
        let summary = RunSummary {
            succeeded: 2,
            failed: 1,
            skipped: 1,
            considered_total: 5,
            elapsed: Duration::ZERO,
        };

        assert_eq!(summary.processed(), 4);
        assert_eq!(summary.unprocessed(), 1);
    }

    #[test]
    fn summary_line_lists_all_counters() {
        let summary = RunSummary {
            succeeded: 5,
            considered_total: 5,
            elapsed: Duration::from_millis(1_300),
            ..RunSummary::default()
        };

        assert_eq!(
            summary.to_string(),
            "succeeded=5 failed=0 skipped=0 considered=5 elapsed=1.3s"
        );
    }
}
