//! Cleanup reporter that writes progress and results to tracing output.

use staleguard_application::{CleanupReporter, ProgressSnapshot};
use staleguard_domain::{CleanupReport, RunOutcome};
use tracing::{info, warn};

/// Reporter that logs snapshots and summaries as structured events.
#[derive(Clone, Default)]
pub struct TracingCleanupReporter;

impl TracingCleanupReporter {
    /// Creates a tracing reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CleanupReporter for TracingCleanupReporter {
    fn progress(&self, snapshot: &ProgressSnapshot) {
        info!(
            activity = snapshot.activity.as_str(),
            status = snapshot.status.as_str(),
            percent = snapshot.percent.unwrap_or_default(),
            elapsed = snapshot.elapsed.as_str(),
            eta_seconds = snapshot.eta_seconds,
            current = snapshot.current_operation.as_deref().unwrap_or(""),
            "progress"
        );
    }

    fn threshold_exceeded(&self, candidates: u64, threshold: u32) {
        warn!(
            candidates = candidates,
            threshold = threshold,
            "{candidates} stale devices found, which reaches the threshold of {threshold}; \
             raise the threshold or disable it to proceed"
        );
    }

    fn summary(&self, report: &CleanupReport) {
        let summary = &report.summary;
        match report.outcome {
            RunOutcome::Interrupted => warn!(
                run_id = report.run_id.as_str(),
                cutoff = %report.cutoff,
                unprocessed = summary.unprocessed(),
                "cleanup interrupted: {summary}"
            ),
            outcome => info!(
                run_id = report.run_id.as_str(),
                cutoff = %report.cutoff,
                outcome = outcome.as_str(),
                "cleanup summary: {summary}"
            ),
        }
    }
}
