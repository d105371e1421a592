// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! `ClaudeMeter` CLI - Claude usage quotas from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Store a session key (validated against claude.ai first)
//! claudemeter key set sk-ant-sid01-...
//!
//! # Show current usage
//! claudemeter
//!
//! # JSON output
//! claudemeter usage --format json --pretty
//!
//! # Poll and notify on thresholds
//! claudemeter watch
//!
//! # Tune thresholds
//! claudemeter config thresholds --warning 70 --critical 90
//! ```

mod commands;
mod notify;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use claudemeter_fetch::{FetchError, ValidationError};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{config, key, notify as notify_cmd, usage, watch};

// ============================================================================
// CLI Definition
// ============================================================================

/// `ClaudeMeter` CLI - Claude usage quota monitoring.
#[derive(Parser)]
#[command(name = "claudemeter")]
#[command(about = "Claude usage quota monitoring CLI")]
#[command(long_about = r#"
ClaudeMeter tracks the claude.ai usage windows of your account:

  • Session (5-hour window)
  • Weekly (7-day window, all models)
  • Weekly Sonnet (7-day window)

and notifies when a window crosses your warning or critical threshold.

Examples:
  claudemeter key set <KEY>     # Store your claude.ai session key
  claudemeter                   # Current usage
  claudemeter watch             # Poll and notify
  claudemeter notify test       # Send a sample notification
  claudemeter --format json     # JSON output
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run. If none, runs 'usage' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Directory for settings and notification state.
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch current usage (default if no command specified).
    #[command(visible_alias = "u")]
    Usage(usage::UsageArgs),

    /// Poll usage and deliver threshold notifications.
    #[command(visible_alias = "w")]
    Watch(watch::WatchArgs),

    /// Manage the session key.
    Key(key::KeyArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),

    /// Check notification delivery.
    Notify(notify_cmd::NotifyArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// No usable session key stored.
    NotConfigured = 2,
    /// Session key rejected.
    AuthFailed = 3,
    /// Timeout.
    Timeout = 4,
}

impl ExitCode {
    /// Picks the exit code for a command error.
    fn for_error(err: &anyhow::Error) -> Self {
        if let Some(fetch) = err.downcast_ref::<FetchError>() {
            return match fetch {
                FetchError::MissingCredential | FetchError::InvalidCredential(_) => {
                    Self::NotConfigured
                }
                FetchError::AuthenticationFailed(_) => Self::AuthFailed,
                FetchError::Timeout => Self::Timeout,
                _ => Self::Error,
            };
        }
        match err.downcast_ref::<ValidationError>() {
            Some(ValidationError::InvalidFormat(_) | ValidationError::Rejected) => Self::AuthFailed,
            _ => Self::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("claudemeter=debug,info")
    } else {
        EnvFilter::new("claudemeter=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result: Result<()> = match &cli.command {
        Some(Commands::Usage(args)) => usage::run(args, &cli).await,
        Some(Commands::Watch(args)) => watch::run(args, &cli).await,
        Some(Commands::Key(args)) => key::run(args, &cli).await,
        Some(Commands::Config(args)) => config::run(args, &cli).await,
        Some(Commands::Notify(args)) => notify_cmd::run(args, &cli),
        None => usage::run(&usage::UsageArgs::default(), &cli).await,
    };

    let code = match result {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            ExitCode::for_error(&e)
        }
    };
    std::process::exit(code as i32);
}

// ============================================================================
// Tests
// ============================================================================
