//! Notify command - check notification delivery.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Subcommand};
use claudemeter_core::{LimitKind, NotificationEvent, NotificationTier};
use tracing::info;

use crate::notify::{NotificationDispatcher, TerminalDispatcher, render};
use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the notify command.
#[derive(Args)]
pub struct NotifyArgs {
    #[command(subcommand)]
    pub action: NotifyAction,
}

/// Notify subcommands.
#[derive(Subcommand)]
pub enum NotifyAction {
    /// Deliver a sample threshold notification.
    Test {
        /// Ring the terminal bell.
        #[arg(long)]
        bell: bool,
    },
}

/// Runs the notify command.
pub fn run(args: &NotifyArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        NotifyAction::Test { bell } => send_test(&TerminalDispatcher::new(*bell), cli),
    }
}

/// Sample event: session window at 85%, one hour before reset.
fn sample_event(now: DateTime<Utc>) -> NotificationEvent {
    NotificationEvent::ThresholdCrossed {
        limit: LimitKind::Session,
        tier: NotificationTier::Warning,
        utilization: 85.0,
        reset_at: now + Duration::hours(1),
    }
}

fn send_test(dispatcher: &dyn NotificationDispatcher, cli: &Cli) -> Result<()> {
    let now = Utc::now();
    let event = sample_event(now);
    dispatcher.dispatch(std::slice::from_ref(&event), now);
    info!("Test notification sent");

    if cli.quiet {
        return Ok(());
    }

    match cli.format {
        OutputFormat::Text => println!("Test notification sent"),
        OutputFormat::Json => {
            let message = render(&event, now);
            let output = serde_json::json!({
                "sent": true,
                "title": message.title,
                "body": message.body,
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
