use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use staleguard_core::{AppResult, NonEmptyString};

use crate::InactivityCutoff;

/// Stable directory object identifier of a device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(NonEmptyString);

impl DeviceId {
    /// Creates a validated device identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        Ok(Self(NonEmptyString::new(value)?))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Device returned by the directory as a deletion candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    id: DeviceId,
    display_name: String,
    approximate_last_sign_in: Option<DateTime<Utc>>,
}

impl DeviceRecord {
    /// Creates a device record from directory listing data.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        approximate_last_sign_in: Option<DateTime<Utc>>,
    ) -> AppResult<Self> {
        Ok(Self {
            id: DeviceId::new(id)?,
            display_name: display_name.into(),
            approximate_last_sign_in,
        })
    }

    /// Returns the directory object identifier.
    #[must_use]
    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    /// Returns the display name used for reporting.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the last recorded sign-in, if the directory has one.
    #[must_use]
    pub fn approximate_last_sign_in(&self) -> Option<DateTime<Utc>> {
        self.approximate_last_sign_in
    }

    /// Returns a label for progress output, falling back to the id when the
    /// display name is blank.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            self.id.as_str()
        } else {
            self.display_name.as_str()
        }
    }

    /// Returns whether the device has been inactive since the cutoff.
    ///
    /// Devices without any recorded sign-in are always stale.
    #[must_use]
    pub fn is_stale(&self, cutoff: &InactivityCutoff) -> bool {
        self.approximate_last_sign_in
            .is_none_or(|last_sign_in| last_sign_in <= cutoff.at())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::InactivityWindow;

    fn cutoff() -> InactivityCutoff {
        let now = Utc
            .with_ymd_and_hms(2025, 3, 31, 12, 0, 0)
            .single()
            .unwrap_or_else(|| unreachable!());
        InactivityCutoff::compute(now, InactivityWindow::default())
    }

    #[test]
    fn blank_device_id_is_rejected() {
        assert!(DeviceId::new("  ").is_err());
        assert!(DeviceRecord::new("", "laptop", None).is_err());
    }

    #[test]
    fn device_without_sign_in_is_stale() {
        let device = DeviceRecord::new("d-1", "kiosk", None);
        assert!(device.is_ok());
        assert!(device.unwrap_or_else(|_| unreachable!()).is_stale(&cutoff()));
    }

    #[test]
    fn sign_in_at_cutoff_is_stale_and_after_is_not() {
        let cutoff = cutoff();
        let at_cutoff = DeviceRecord::new("d-1", "a", Some(cutoff.at()));
        let after_cutoff = DeviceRecord::new("d-2", "b", Some(cutoff.at() + Duration::seconds(1)));

        assert!(at_cutoff.unwrap_or_else(|_| unreachable!()).is_stale(&cutoff));
        assert!(!after_cutoff.unwrap_or_else(|_| unreachable!()).is_stale(&cutoff));
    }

    #[test]
    fn label_falls_back_to_id() {
        let device = DeviceRecord::new("d-9", " ", None).unwrap_or_else(|_| unreachable!());
        assert_eq!(device.label(), "d-9");
    }
}
