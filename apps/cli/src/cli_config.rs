use std::time::Duration;

use clap::Parser;
use staleguard_core::{AppError, AppResult};
use staleguard_domain::{
    CleanupPolicy, CleanupPolicyInput, DEFAULT_INACTIVITY_DAYS, DEFAULT_THRESHOLD,
};
use staleguard_infrastructure::GraphDirectoryConfig;

const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Deletes directory devices that have not signed in within the inactivity window.
#[derive(Debug, Parser)]
#[command(name = "staleguard", version)]
pub struct CliArgs {
    /// Days without sign-in after which a device is stale.
    #[arg(long, env = "STALEGUARD_INACTIVITY_DAYS", default_value_t = DEFAULT_INACTIVITY_DAYS)]
    inactivity_days: u32,

    /// Abort when this many candidates or more are found; negative disables the check.
    #[arg(
        long,
        env = "STALEGUARD_THRESHOLD",
        default_value_t = DEFAULT_THRESHOLD,
        allow_negative_numbers = true
    )]
    threshold: i64,

    /// Skip the threshold check entirely.
    #[arg(long, env = "STALEGUARD_DISABLE_THRESHOLD")]
    disable_threshold: bool,

    /// Report what would be deleted without deleting anything.
    #[arg(long, env = "STALEGUARD_DRY_RUN")]
    dry_run: bool,

    /// Ask before deleting each device.
    #[arg(long, env = "STALEGUARD_CONFIRM")]
    confirm: bool,

    /// Graph API root.
    #[arg(long, env = "GRAPH_BASE_URL", default_value = DEFAULT_GRAPH_BASE_URL)]
    graph_base_url: String,

    /// Bearer token with Device.ReadWrite.All.
    #[arg(long, env = "GRAPH_ACCESS_TOKEN", hide_env_values = true)]
    graph_access_token: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "GRAPH_TIMEOUT_SECS", default_value_t = 30)]
    graph_timeout_secs: u64,

    /// Attempts per request when Graph throttles or is unavailable.
    #[arg(long, env = "GRAPH_MAX_ATTEMPTS", default_value_t = 3)]
    graph_max_attempts: u8,

    /// Backoff step between attempts in milliseconds.
    #[arg(long, env = "GRAPH_RETRY_BACKOFF_MS", default_value_t = 500)]
    graph_retry_backoff_ms: u64,
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub policy: CleanupPolicy,
    pub graph: GraphDirectoryConfig,
    pub request_timeout: Duration,
}

impl CliConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_args(CliArgs::parse())
    }

    fn from_args(args: CliArgs) -> AppResult<Self> {
        let policy = CleanupPolicy::new(CleanupPolicyInput {
            inactivity_days: args.inactivity_days,
            threshold: args.threshold,
            threshold_disabled: args.disable_threshold,
            dry_run: args.dry_run,
            confirm_each: args.confirm,
        })?;

        let access_token = args
            .graph_access_token
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::Validation("GRAPH_ACCESS_TOKEN is required".to_owned()))?;

        if args.graph_timeout_secs == 0 {
            return Err(AppError::Validation(
                "GRAPH_TIMEOUT_SECS must be greater than zero".to_owned(),
            ));
        }

        if args.graph_max_attempts == 0 {
            return Err(AppError::Validation(
                "GRAPH_MAX_ATTEMPTS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            policy,
            graph: GraphDirectoryConfig {
                base_url: args.graph_base_url.trim_end_matches('/').to_owned(),
                access_token,
                max_attempts: args.graph_max_attempts,
                retry_backoff_ms: args.graph_retry_backoff_ms,
            },
            request_timeout: Duration::from_secs(args.graph_timeout_secs),
        })
    }
}
