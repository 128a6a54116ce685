//! Application services and ports.

#![forbid(unsafe_code)]

mod cleanup_ports;
mod cleanup_service;
mod progress_tracker;

pub use cleanup_ports::{CancellationFlag, CleanupReporter, DeleteConfirmation, DirectoryClient};
pub use cleanup_service::CleanupService;
pub use progress_tracker::{ProgressSnapshot, ProgressTracker};
