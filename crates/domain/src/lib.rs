//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod cutoff;
mod device;
mod policy;
mod summary;

pub use cutoff::InactivityCutoff;
pub use device::{DeviceId, DeviceRecord};
pub use policy::{
    CleanupPolicy, CleanupPolicyInput, DEFAULT_INACTIVITY_DAYS, DEFAULT_THRESHOLD,
    InactivityWindow, ThresholdPolicy,
};
pub use summary::{CleanupReport, RunOutcome, RunSummary};
