//! Progress and ETA tracking for long-running batch operations.
//!
//! One [`ProgressTracker`] owns the state of any number of independent
//! operations, each keyed by an operation id. State is created lazily on the
//! first update, restarted when the reported total changes or on an explicit
//! [`ProgressTracker::reset`], and dropped by [`ProgressTracker::complete`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Debug, Clone, Copy)]
struct ProgressState {
    started_at: Instant,
    current_index: u64,
    total: u64,
}

impl ProgressState {
    fn new(total: u64, now: Instant) -> Self {
        Self {
            started_at: now,
            current_index: 0,
            total,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum IndexUpdate {
    Advance,
    Set(u64),
}

/// Display-oriented view of one operation's progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    /// Activity label of the tracker.
    pub activity: String,
    /// Human readable position, e.g. `3 of 20`.
    pub status: String,
    /// Elapsed time formatted as `HH:MM:SS`.
    pub elapsed: String,
    /// Percentage complete rounded to two decimals; `None` when total is zero.
    pub percent: Option<f64>,
    /// Estimated seconds remaining; `None` until at least one item is done.
    pub eta_seconds: Option<u64>,
    /// Label of the item currently being processed.
    pub current_operation: Option<String>,
    /// Clamped index the snapshot was computed from.
    pub index: u64,
    /// Expected item count.
    pub total: u64,
}

/// Tracks progress for independent operations keyed by id.
#[derive(Debug)]
pub struct ProgressTracker {
    activity: String,
    states: HashMap<String, ProgressState>,
}

impl ProgressTracker {
    /// Creates a tracker whose snapshots carry the given activity label.
    #[must_use]
    pub fn new(activity: impl Into<String>) -> Self {
        Self {
            activity: activity.into(),
            states: HashMap::new(),
        }
    }

    /// Moves the operation one item forward from its last recorded index.
    pub fn advance(&mut self, id: &str, total: u64, label: Option<&str>) -> ProgressSnapshot {
        self.update_at(id, total, IndexUpdate::Advance, label, Instant::now())
    }

    /// Records an explicit index for the operation.
    pub fn set_index(
        &mut self,
        id: &str,
        total: u64,
        index: u64,
        label: Option<&str>,
    ) -> ProgressSnapshot {
        self.update_at(id, total, IndexUpdate::Set(index), label, Instant::now())
    }

    /// Restarts the clock and index of an operation while keeping its total.
    ///
    /// Returns false when the id is not being tracked.
    pub fn reset(&mut self, id: &str) -> bool {
        self.reset_at(id, Instant::now())
    }

    /// Produces the final snapshot for the operation and forgets its state.
    ///
    /// Safe to call for ids that were never updated.
    pub fn complete(&mut self, id: &str, total: u64, label: Option<&str>) -> ProgressSnapshot {
        self.complete_at(id, total, label, Instant::now())
    }

    /// Returns whether state exists for the id.
    #[must_use]
    pub fn is_tracking(&self, id: &str) -> bool {
        self.states.contains_key(id)
    }

    /// Returns the number of operations currently tracked.
    #[must_use]
    pub fn active_operations(&self) -> usize {
        self.states.len()
    }

    fn update_at(
        &mut self,
        id: &str,
        total: u64,
        update: IndexUpdate,
        label: Option<&str>,
        now: Instant,
    ) -> ProgressSnapshot {
        let state = self
            .states
            .entry(id.to_owned())
            .or_insert_with(|| ProgressState::new(total, now));

        // A different total means the key is being reused for a new operation.
        if state.total != total {
            *state = ProgressState::new(total, now);
        }

        let requested = match update {
            IndexUpdate::Advance => state.current_index.saturating_add(1),
            IndexUpdate::Set(index) => index,
        };
        let index = requested.min(total);
        state.current_index = index;

        let elapsed = now.saturating_duration_since(state.started_at);
        self.snapshot(index, total, elapsed, label)
    }

    fn reset_at(&mut self, id: &str, now: Instant) -> bool {
        match self.states.get_mut(id) {
            Some(state) => {
                *state = ProgressState::new(state.total, now);
                true
            }
            None => false,
        }
    }

    fn complete_at(
        &mut self,
        id: &str,
        total: u64,
        label: Option<&str>,
        now: Instant,
    ) -> ProgressSnapshot {
        let elapsed = self
            .states
            .remove(id)
            .map(|state| now.saturating_duration_since(state.started_at))
            .unwrap_or_default();

        let mut snapshot = self.snapshot(total, total, elapsed, label);
        snapshot.eta_seconds = Some(0);
        snapshot
    }

    fn snapshot(
        &self,
        index: u64,
        total: u64,
        elapsed: Duration,
        label: Option<&str>,
    ) -> ProgressSnapshot {
        ProgressSnapshot {
            activity: self.activity.clone(),
            status: format!("{index} of {total}"),
            elapsed: format_elapsed(elapsed),
            percent: percent_complete(index, total),
            eta_seconds: estimate_remaining(index, total, elapsed),
            current_operation: label.map(str::to_owned),
            index,
            total,
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new("Processing")
    }
}

fn percent_complete(index: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }

    let percent = (index as f64 / total as f64 * 100.0).clamp(0.0, 100.0);
    Some((percent * 100.0).round() / 100.0)
}

fn estimate_remaining(index: u64, total: u64, elapsed: Duration) -> Option<u64> {
    if index == 0 || total < index {
        return None;
    }

    let per_item = elapsed.as_secs_f64() / index as f64;
    let remaining = (per_item * (total - index) as f64).max(0.0).round();
    Some(remaining as u64)
}

fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3_600,
        (seconds % 3_600) / 60,
        seconds % 60
    )
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{IndexUpdate, ProgressTracker, format_elapsed};

    #[test]
    fn advancing_with_same_total_yields_sequential_indexes() {
        let mut tracker = ProgressTracker::default();

        let indexes: Vec<u64> = (0..5)
            .map(|_| tracker.advance("batch", 5, None).index)
            .collect();

        assert_eq!(indexes, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn changed_total_restarts_operation() {
        let mut tracker = ProgressTracker::default();
        let start = Instant::now();
        tracker.update_at("batch", 10, IndexUpdate::Advance, None, start);
        tracker.update_at("batch", 10, IndexUpdate::Advance, None, start);

        let later = start + Duration::from_secs(120);
        let snapshot = tracker.update_at("batch", 4, IndexUpdate::Advance, None, later);

        assert_eq!(snapshot.index, 1);
        assert_eq!(snapshot.total, 4);
        assert_eq!(snapshot.elapsed, "00:00:00");
    }

    #[test]
    fn explicit_reset_keeps_total_and_restarts_index() {
        let mut tracker = ProgressTracker::default();
        tracker.set_index("batch", 8, 6, None);

        assert!(tracker.reset("batch"));
        assert!(!tracker.reset("unknown"));
        assert_eq!(tracker.advance("batch", 8, None).index, 1);
    }

    #[test]
    fn index_is_clamped_to_total() {
        let mut tracker = ProgressTracker::default();

        let snapshot = tracker.set_index("batch", 3, 7, Some("overflow"));
        assert_eq!(snapshot.index, 3);
        assert_eq!(snapshot.percent, Some(100.0));

        let snapshot = tracker.advance("batch", 3, None);
        assert_eq!(snapshot.index, 3);
    }

    #[test]
    fn percent_is_rounded_to_two_decimals() {
        let mut tracker = ProgressTracker::default();

        let snapshot = tracker.set_index("batch", 3, 1, None);

        assert_eq!(snapshot.percent, Some(33.33));
        assert_eq!(snapshot.status, "1 of 3");
    }

    #[test]
    fn zero_total_has_no_percent_or_eta() {
        let mut tracker = ProgressTracker::default();

        let snapshot = tracker.advance("empty", 0, None);

        assert_eq!(snapshot.index, 0);
        assert_eq!(snapshot.percent, None);
        assert_eq!(snapshot.eta_seconds, None);
    }

    #[test]
    fn eta_extrapolates_average_item_time() {
        let mut tracker = ProgressTracker::default();
        let start = Instant::now();
        tracker.update_at("batch", 10, IndexUpdate::Set(0), None, start);

        let snapshot = tracker.update_at(
            "batch",
            10,
            IndexUpdate::Set(2),
            Some("device-2"),
            start + Duration::from_secs(10),
        );

        assert_eq!(snapshot.eta_seconds, Some(40));
        assert_eq!(snapshot.elapsed, "00:00:10");
        assert_eq!(snapshot.current_operation.as_deref(), Some("device-2"));
    }

    #[test]
    fn eta_is_unknown_before_first_item() {
        let mut tracker = ProgressTracker::default();

        let snapshot = tracker.set_index("batch", 10, 0, None);

        assert_eq!(snapshot.eta_seconds, None);
        assert_eq!(snapshot.percent, Some(0.0));
    }

    #[test]
    fn complete_forgets_state() {
        let mut tracker = ProgressTracker::new("Removing stale devices");
        tracker.advance("batch", 4, None);
        tracker.advance("batch", 4, None);

        let final_snapshot = tracker.complete("batch", 4, None);
        assert_eq!(final_snapshot.percent, Some(100.0));
        assert_eq!(final_snapshot.eta_seconds, Some(0));
        assert_eq!(final_snapshot.activity, "Removing stale devices");
        assert!(!tracker.is_tracking("batch"));

        assert_eq!(tracker.advance("batch", 4, None).index, 1);
    }

    #[test]
    fn complete_without_state_is_harmless() {
        let mut tracker = ProgressTracker::default();

        let snapshot = tracker.complete("never-started", 0, None);

        assert_eq!(snapshot.elapsed, "00:00:00");
        assert_eq!(snapshot.percent, None);
        assert_eq!(tracker.active_operations(), 0);
    }

    #[test]
    fn operations_are_tracked_independently() {
        let mut tracker = ProgressTracker::default();
        tracker.advance("outer", 2, None);
        tracker.advance("inner", 50, None);
        tracker.advance("inner", 50, None);

        assert_eq!(tracker.advance("outer", 2, None).index, 2);
        assert_eq!(tracker.advance("inner", 50, None).index, 3);
        assert_eq!(tracker.active_operations(), 2);
    }

    #[test]
    fn elapsed_formats_hours_minutes_seconds() {
        assert_eq!(format_elapsed(Duration::from_secs(3_725)), "01:02:05");
    }
}
