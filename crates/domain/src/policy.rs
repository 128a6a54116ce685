use serde::{Deserialize, Serialize};

use staleguard_core::{AppError, AppResult};

/// Default inactivity window in days.
pub const DEFAULT_INACTIVITY_DAYS: u32 = 90;

/// Default candidate count at which the threshold gate aborts a run.
pub const DEFAULT_THRESHOLD: i64 = 20;

/// Number of days without sign-in after which a device is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InactivityWindow(u32);

impl InactivityWindow {
    /// Creates a validated inactivity window.
    pub fn from_days(days: u32) -> AppResult<Self> {
        if days == 0 {
            return Err(AppError::Validation(
                "inactivity window must be at least one day".to_owned(),
            ));
        }

        Ok(Self(days))
    }

    /// Returns the window length in days.
    #[must_use]
    pub fn days(self) -> u32 {
        self.0
    }

    /// Returns the window as a chrono duration.
    #[must_use]
    pub fn as_duration(self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.0))
    }
}

impl Default for InactivityWindow {
    fn default() -> Self {
        Self(DEFAULT_INACTIVITY_DAYS)
    }
}

/// Safety gate applied to the candidate count before any deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "limit", rename_all = "snake_case")]
pub enum ThresholdPolicy {
    /// Gate is bypassed for any candidate count.
    Disabled,
    /// Runs abort when the candidate count reaches this limit.
    Limit(u32),
}

impl ThresholdPolicy {
    /// Builds the gate from raw input where a negative threshold disables it.
    pub fn from_raw(threshold: i64, disabled: bool) -> AppResult<Self> {
        if disabled || threshold < 0 {
            return Ok(Self::Disabled);
        }

        u32::try_from(threshold).map(Self::Limit).map_err(|_| {
            AppError::Validation(format!(
                "threshold {threshold} exceeds the supported maximum of {}",
                u32::MAX
            ))
        })
    }

    /// Returns whether a run with `candidates` items must be aborted.
    ///
    /// The boundary is inclusive: a limit of 20 blocks exactly 20 candidates.
    #[must_use]
    pub fn blocks(self, candidates: usize) -> bool {
        match self {
            Self::Disabled => false,
            Self::Limit(limit) => u64::try_from(candidates).unwrap_or(u64::MAX) >= u64::from(limit),
        }
    }

    /// Returns the configured limit when the gate is active.
    #[must_use]
    pub fn limit(self) -> Option<u32> {
        match self {
            Self::Disabled => None,
            Self::Limit(limit) => Some(limit),
        }
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::Limit(20)
    }
}

/// Raw policy values as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupPolicyInput {
    /// Inactivity window in days.
    pub inactivity_days: u32,
    /// Threshold value; negative disables the gate.
    pub threshold: i64,
    /// Explicitly disables the gate.
    pub threshold_disabled: bool,
    /// Reports intended deletions without performing them.
    pub dry_run: bool,
    /// Asks for confirmation before each real deletion.
    pub confirm_each: bool,
}

impl Default for CleanupPolicyInput {
    fn default() -> Self {
        Self {
            inactivity_days: DEFAULT_INACTIVITY_DAYS,
            threshold: DEFAULT_THRESHOLD,
            threshold_disabled: false,
            dry_run: false,
            confirm_each: false,
        }
    }
}

/// Immutable policy for one cleanup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupPolicy {
    inactivity_window: InactivityWindow,
    threshold: ThresholdPolicy,
    dry_run: bool,
    confirm_each: bool,
}

impl CleanupPolicy {
    /// Creates a validated cleanup policy.
    pub fn new(input: CleanupPolicyInput) -> AppResult<Self> {
        let CleanupPolicyInput {
            inactivity_days,
            threshold,
            threshold_disabled,
            dry_run,
            confirm_each,
        } = input;

        Ok(Self {
            inactivity_window: InactivityWindow::from_days(inactivity_days)?,
            threshold: ThresholdPolicy::from_raw(threshold, threshold_disabled)?,
            dry_run,
            confirm_each,
        })
    }

    /// Returns the inactivity window.
    #[must_use]
    pub fn inactivity_window(&self) -> InactivityWindow {
        self.inactivity_window
    }

    /// Returns the threshold gate.
    #[must_use]
    pub fn threshold(&self) -> ThresholdPolicy {
        self.threshold
    }

    /// Returns whether deletions are only simulated.
    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Returns whether each real deletion needs confirmation.
    #[must_use]
    pub fn confirm_each(&self) -> bool {
        self.confirm_each
    }
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self {
            inactivity_window: InactivityWindow::default(),
            threshold: ThresholdPolicy::default(),
            dry_run: false,
            confirm_each: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn zero_day_window_is_rejected() {
        assert!(InactivityWindow::from_days(0).is_err());
        assert!(InactivityWindow::from_days(1).is_ok());
    }

    #[test]
    fn negative_threshold_disables_gate() {
        let policy = CleanupPolicy::new(CleanupPolicyInput {
            threshold: -1,
            ..CleanupPolicyInput::default()
        });
        assert!(policy.is_ok());
        assert_eq!(
            policy.unwrap_or_else(|_| unreachable!()).threshold(),
            ThresholdPolicy::Disabled
        );
    }

    #[test]
    fn disabled_flag_wins_over_positive_threshold() {
        let threshold = ThresholdPolicy::from_raw(20, true);
        assert!(matches!(threshold, Ok(ThresholdPolicy::Disabled)));
    }

    #[test]
    fn oversized_threshold_is_rejected() {
        let threshold = ThresholdPolicy::from_raw(i64::from(u32::MAX) + 1, false);
        assert!(matches!(threshold, Err(AppError::Validation(_))));
    }

    #[test]
    fn default_policy_matches_default_input() {
        let policy = CleanupPolicy::new(CleanupPolicyInput::default());
        assert!(policy.is_ok());
        assert_eq!(policy.unwrap_or_else(|_| unreachable!()), CleanupPolicy::default());
    }

    #[test]
    fn gate_boundary_is_inclusive() {
        let gate = ThresholdPolicy::Limit(20);
        assert!(gate.blocks(20));
        assert!(gate.blocks(21));
        assert!(!gate.blocks(19));
    }

    proptest! {
        #[test]
        fn limit_blocks_iff_count_reaches_threshold(limit in 0_u32..10_000, count in 0_usize..20_000) {
            let gate = ThresholdPolicy::Limit(limit);
            prop_assert_eq!(gate.blocks(count), count as u64 >= u64::from(limit));
        }

        #[test]
        fn disabled_gate_never_blocks(count in any::<usize>()) {
            prop_assert!(!ThresholdPolicy::Disabled.blocks(count));
        }
    }
}
