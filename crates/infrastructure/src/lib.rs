//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod graph_directory_client;
mod stdin_delete_confirmation;
mod tracing_cleanup_reporter;

pub use graph_directory_client::{GraphDirectoryClient, GraphDirectoryConfig};
pub use stdin_delete_confirmation::StdinDeleteConfirmation;
pub use tracing_cleanup_reporter::TracingCleanupReporter;
