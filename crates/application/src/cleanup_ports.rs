use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use staleguard_core::AppResult;
use staleguard_domain::{CleanupReport, DeviceId, DeviceRecord, InactivityCutoff};

use crate::ProgressSnapshot;

/// Port for the remote identity directory.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Lists devices whose last sign-in is at or before the cutoff.
    ///
    /// Implementations return every match; paging stays inside the adapter.
    async fn list_stale(&self, cutoff: &InactivityCutoff) -> AppResult<Vec<DeviceRecord>>;

    /// Deletes one device.
    ///
    /// A device that no longer exists must be reported as
    /// `AppError::NotFound`.
    async fn delete_device(&self, id: &DeviceId) -> AppResult<()>;
}

/// Port asked before each real deletion when confirmation is enabled.
#[async_trait]
pub trait DeleteConfirmation: Send + Sync {
    /// Returns true when the device may be deleted.
    async fn confirm_delete(&self, device: &DeviceRecord) -> AppResult<bool>;
}

/// Output port for run progress and results.
pub trait CleanupReporter: Send + Sync {
    /// Publishes one progress snapshot.
    fn progress(&self, snapshot: &ProgressSnapshot);

    /// Publishes the threshold gate warning.
    fn threshold_exceeded(&self, candidates: u64, threshold: u32);

    /// Publishes the final report of a run.
    fn summary(&self, report: &CleanupReport);
}

/// Cooperative cancellation signal checked between deletions.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
