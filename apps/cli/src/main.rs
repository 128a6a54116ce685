//! staleguard command line runtime.

#![forbid(unsafe_code)]

mod cli_config;

use std::process::ExitCode;
use std::sync::Arc;

use staleguard_application::{CancellationFlag, CleanupService, ProgressTracker};
use staleguard_core::{AppError, AppResult};
use staleguard_domain::{CleanupReport, RunOutcome};
use staleguard_infrastructure::{
    GraphDirectoryClient, StdinDeleteConfirmation, TracingCleanupReporter,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli_config::CliConfig;

/// Exit status used when the run was stopped by an interrupt.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    match run().await {
        Ok(exit_code) => exit_code,
        Err(error) => {
            error!(error = %error, "staleguard failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> AppResult<ExitCode> {
    let config = CliConfig::load()?;
    let http_client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;
    let directory = Arc::new(GraphDirectoryClient::new(http_client, config.graph.clone())?);

    let cancellation = CancellationFlag::new();
    spawn_interrupt_handler(cancellation.clone());

    let mut service = CleanupService::new(directory, Arc::new(TracingCleanupReporter::new()))
        .with_cancellation(cancellation);
    if config.policy.confirm_each() {
        service = service.with_confirmation(Arc::new(StdinDeleteConfirmation::new()));
    }

    info!(
        graph_base_url = %config.graph.base_url,
        inactivity_days = config.policy.inactivity_window().days(),
        threshold = ?config.policy.threshold().limit(),
        dry_run = config.policy.dry_run(),
        confirm = config.policy.confirm_each(),
        "staleguard started"
    );

    let mut tracker = ProgressTracker::new("Removing stale devices");
    let report = service.run(&config.policy, &mut tracker).await?;

    println!("{}", summary_line(&report, config.policy.dry_run()));
    Ok(exit_code(&report))
}

fn spawn_interrupt_handler(cancellation: CancellationFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("interrupt received, stopping after the current device");
        cancellation.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("second interrupt received, exiting immediately");
            std::process::exit(i32::from(EXIT_INTERRUPTED));
        }
    });
}

fn summary_line(report: &CleanupReport, dry_run: bool) -> String {
    let mode = if dry_run { " (dry run)" } else { "" };
    match report.outcome {
        RunOutcome::NothingToDelete => format!(
            "No devices inactive since {}{mode}. {}",
            report.cutoff, report.summary
        ),
        RunOutcome::ThresholdExceeded {
            candidates,
            threshold,
        } => format!(
            "Aborted{mode}: {candidates} candidates reach the threshold of {threshold}. {}",
            report.summary
        ),
        RunOutcome::Completed => format!("Completed{mode}. {}", report.summary),
        RunOutcome::Interrupted => format!("Interrupted{mode}. {}", report.summary),
    }
}

fn exit_code(report: &CleanupReport) -> ExitCode {
    match report.outcome {
        RunOutcome::Interrupted => ExitCode::from(EXIT_INTERRUPTED),
        RunOutcome::Completed if report.summary.failed > 0 => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use staleguard_domain::{
        CleanupReport, InactivityCutoff, InactivityWindow, RunOutcome, RunSummary,
    };

    use super::summary_line;

    fn report(outcome: RunOutcome, summary: RunSummary) -> CleanupReport {
        let now = Utc
            .with_ymd_and_hms(2025, 6, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(|| unreachable!());
        CleanupReport {
            run_id: "run-1".to_owned(),
            cutoff: InactivityCutoff::compute(now, InactivityWindow::default()),
            outcome,
            summary,
        }
    }

    #[test]
    fn threshold_abort_line_names_counts() {
        let line = summary_line(
            &report(
                RunOutcome::ThresholdExceeded {
                    candidates: 20,
                    threshold: 20,
                },
                RunSummary::for_candidates(20),
            ),
            false,
        );

        assert_eq!(
            line,
            "Aborted: 20 candidates reach the threshold of 20. \
             succeeded=0 failed=0 skipped=0 considered=20 elapsed=0.0s"
        );
    }

    #[test]
    fn dry_run_is_marked_in_summary_line() {
        let summary = RunSummary {
            succeeded: 3,
            considered_total: 3,
            elapsed: Duration::ZERO,
            ..RunSummary::default()
        };

        let line = summary_line(&report(RunOutcome::Completed, summary), true);

        assert!(line.starts_with("Completed (dry run)."));
    }
}
