use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use staleguard_core::{AppError, AppResult};
use staleguard_domain::{
    CleanupPolicy, CleanupReport, DeviceRecord, InactivityCutoff, RunOutcome, RunSummary,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::ProgressTracker;
use crate::cleanup_ports::{
    CancellationFlag, CleanupReporter, DeleteConfirmation, DirectoryClient,
};

/// How one candidate ended up after its turn in the delete loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceOutcome {
    Succeeded,
    Skipped,
    Failed,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    Exhausted,
    Cancelled,
}

/// Stale device cleanup workflow.
#[derive(Clone)]
pub struct CleanupService {
    directory: Arc<dyn DirectoryClient>,
    reporter: Arc<dyn CleanupReporter>,
    confirmation: Option<Arc<dyn DeleteConfirmation>>,
    cancellation: CancellationFlag,
}

impl CleanupService {
    /// Creates a cleanup service.
    #[must_use]
    pub fn new(directory: Arc<dyn DirectoryClient>, reporter: Arc<dyn CleanupReporter>) -> Self {
        Self {
            directory,
            reporter,
            confirmation: None,
            cancellation: CancellationFlag::new(),
        }
    }

    /// Adds the collaborator consulted when policies require confirmation.
    #[must_use]
    pub fn with_confirmation(mut self, confirmation: Arc<dyn DeleteConfirmation>) -> Self {
        self.confirmation = Some(confirmation);
        self
    }

    /// Uses the given flag to stop the delete loop early.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Runs one cleanup pass under the policy.
    ///
    /// Listing failures are returned as errors before anything is deleted.
    /// Per-device delete failures only show up in the summary counters.
    pub async fn run(
        &self,
        policy: &CleanupPolicy,
        tracker: &mut ProgressTracker,
    ) -> AppResult<CleanupReport> {
        self.run_at(policy, tracker, Utc::now()).await
    }

    async fn run_at(
        &self,
        policy: &CleanupPolicy,
        tracker: &mut ProgressTracker,
        now: DateTime<Utc>,
    ) -> AppResult<CleanupReport> {
        if policy.confirm_each() && !policy.dry_run() && self.confirmation.is_none() {
            return Err(AppError::Validation(
                "confirmation was requested but no confirmation handler is configured".to_owned(),
            ));
        }

        let started_at = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        let cutoff = InactivityCutoff::compute(now, policy.inactivity_window());

        info!(
            run_id = %run_id,
            cutoff = %cutoff,
            inactivity_days = policy.inactivity_window().days(),
            dry_run = policy.dry_run(),
            "listing stale devices"
        );

        let candidates = self.directory.list_stale(&cutoff).await?;
        let mut summary = RunSummary::for_candidates(candidates.len());

        if candidates.is_empty() {
            info!(run_id = %run_id, "no stale devices found");
            summary.elapsed = started_at.elapsed();
            return Ok(self.finish(run_id, cutoff, RunOutcome::NothingToDelete, summary));
        }

        let threshold = policy.threshold();
        if threshold.blocks(candidates.len()) {
            let limit = threshold.limit().unwrap_or_default();
            warn!(
                run_id = %run_id,
                candidates = summary.considered_total,
                threshold = limit,
                "candidate count reached the safety threshold, nothing deleted"
            );
            self.reporter
                .threshold_exceeded(summary.considered_total, limit);
            summary.elapsed = started_at.elapsed();
            let outcome = RunOutcome::ThresholdExceeded {
                candidates: summary.considered_total,
                threshold: limit,
            };
            return Ok(self.finish(run_id, cutoff, outcome, summary));
        }

        let loop_result = self
            .delete_candidates(&run_id, policy, &candidates, tracker, &mut summary)
            .await;

        // Runs on every exit path of the loop, including propagated errors.
        let final_snapshot = tracker.complete(&run_id, summary.considered_total, None);
        self.reporter.progress(&final_snapshot);
        summary.elapsed = started_at.elapsed();

        let outcome = match &loop_result {
            Ok(LoopExit::Exhausted) => RunOutcome::Completed,
            Ok(LoopExit::Cancelled) | Err(_) => RunOutcome::Interrupted,
        };
        let report = self.finish(run_id, cutoff, outcome, summary);

        loop_result.map(|_| report)
    }

    async fn delete_candidates(
        &self,
        run_id: &str,
        policy: &CleanupPolicy,
        candidates: &[DeviceRecord],
        tracker: &mut ProgressTracker,
        summary: &mut RunSummary,
    ) -> AppResult<LoopExit> {
        let total = summary.considered_total;

        for device in candidates {
            if self.cancellation.is_cancelled() {
                warn!(
                    run_id = %run_id,
                    processed = summary.processed(),
                    remaining = summary.unprocessed(),
                    "cleanup interrupted"
                );
                return Ok(LoopExit::Cancelled);
            }

            let snapshot = tracker.advance(run_id, total, Some(device.label()));
            self.reporter.progress(&snapshot);

            match self.process_device(run_id, policy, device).await? {
                DeviceOutcome::Succeeded => summary.succeeded += 1,
                DeviceOutcome::Skipped => summary.skipped += 1,
                DeviceOutcome::Failed => summary.failed += 1,
                DeviceOutcome::Declined => {}
            }
        }

        Ok(LoopExit::Exhausted)
    }

    async fn process_device(
        &self,
        run_id: &str,
        policy: &CleanupPolicy,
        device: &DeviceRecord,
    ) -> AppResult<DeviceOutcome> {
        if policy.dry_run() {
            info!(
                run_id = %run_id,
                device_id = %device.id(),
                display_name = device.display_name(),
                "dry run: device would be deleted"
            );
            return Ok(DeviceOutcome::Succeeded);
        }

        if policy.confirm_each()
            && let Some(confirmation) = &self.confirmation
            && !confirmation.confirm_delete(device).await?
        {
            info!(run_id = %run_id, device_id = %device.id(), "deletion declined");
            return Ok(DeviceOutcome::Declined);
        }

        match self.directory.delete_device(device.id()).await {
            Ok(()) => {
                info!(
                    run_id = %run_id,
                    device_id = %device.id(),
                    display_name = device.display_name(),
                    "device deleted"
                );
                Ok(DeviceOutcome::Succeeded)
            }
            Err(error) if error.is_not_found() => {
                info!(
                    run_id = %run_id,
                    device_id = %device.id(),
                    "device already removed"
                );
                Ok(DeviceOutcome::Skipped)
            }
            Err(error) => {
                warn!(
                    run_id = %run_id,
                    device_id = %device.id(),
                    display_name = device.display_name(),
                    error = %error,
                    "device deletion failed"
                );
                Ok(DeviceOutcome::Failed)
            }
        }
    }

    fn finish(
        &self,
        run_id: String,
        cutoff: InactivityCutoff,
        outcome: RunOutcome,
        summary: RunSummary,
    ) -> CleanupReport {
        info!(
            run_id = %run_id,
            outcome = outcome.as_str(),
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            considered = summary.considered_total,
            elapsed_ms = u64::try_from(summary.elapsed.as_millis()).unwrap_or(u64::MAX),
            "cleanup finished"
        );

        let report = CleanupReport {
            run_id,
            cutoff,
            outcome,
            summary,
        };
        self.reporter.summary(&report);
        report
    }
}
