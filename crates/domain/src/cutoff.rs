use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::InactivityWindow;

/// Point in time before which devices count as inactive.
///
/// Always UTC with whole-second precision so it renders identically to the
/// timestamps used by the directory's filter query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InactivityCutoff(DateTime<Utc>);

impl InactivityCutoff {
    /// Computes `now - window`, truncated to whole seconds.
    #[must_use]
    pub fn compute(now: DateTime<Utc>, window: InactivityWindow) -> Self {
        Self((now - window.as_duration()).trunc_subsecs(0))
    }

    /// Returns the cutoff instant.
    #[must_use]
    pub fn at(&self) -> DateTime<Utc> {
        self.0
    }

    /// Renders the cutoff as `YYYY-MM-DDTHH:MM:SSZ`.
    #[must_use]
    pub fn as_filter_timestamp(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

impl std::fmt::Display for InactivityCutoff {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_filter_timestamp().as_str())
    }
}
