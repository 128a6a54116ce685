use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use staleguard_application::DeleteConfirmation;
use staleguard_core::{AppError, AppResult};
use staleguard_domain::DeviceRecord;

/// Interactive confirmation that prompts on stderr and reads stdin.
#[derive(Clone, Default)]
pub struct StdinDeleteConfirmation;

impl StdinDeleteConfirmation {
    /// Creates a stdin confirmation handler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DeleteConfirmation for StdinDeleteConfirmation {
    async fn confirm_delete(&self, device: &DeviceRecord) -> AppResult<bool> {
        let prompt = format!(
            "Delete device '{}' ({}), last sign-in {}? [y/N] ",
            device.label(),
            device.id(),
            device
                .approximate_last_sign_in()
                .map_or_else(|| "never".to_owned(), |at| at.to_rfc3339()),
        );

        tokio::task::spawn_blocking(move || {
            let mut stderr = io::stderr().lock();
            stderr.write_all(prompt.as_bytes())?;
            stderr.flush()?;

            let mut answer = String::new();
            let read = io::stdin().lock().read_line(&mut answer)?;
            if read == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stdin closed while waiting for confirmation",
                ));
            }

            Ok(parse_answer(answer.as_str()))
        })
        .await
        .map_err(|error| AppError::Internal(format!("confirmation prompt panicked: {error}")))?
        .map_err(|error| AppError::Internal(format!("failed to read confirmation: {error}")))
    }
}

fn parse_answer(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::parse_answer;

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(parse_answer("y\n"));
        assert!(parse_answer(" YES "));
        assert!(!parse_answer("\n"));
        assert!(!parse_answer("no"));
        assert!(!parse_answer("yep"));
    }
}
