//! Watch command - poll usage and deliver threshold notifications.
//!
//! Each tick fetches through the coordinator, evaluates the snapshot against
//! the configured thresholds, dispatches the resulting events, and persists
//! the notification state. Settings are read again on every tick, so edits
//! made with `claudemeter config` apply to the running watcher.

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use clap::Args;
use claudemeter_core::{NotificationState, UsageSnapshot, evaluate};
use claudemeter_store::{
    AppSettings, MAX_REFRESH_INTERVAL_SECS, MIN_REFRESH_INTERVAL_SECS, SettingsRepository,
};
use std::io::{Write, stdout};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::AppContext;
use crate::notify::{NotificationDispatcher, TerminalDispatcher};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for watch command.
#[derive(Args)]
pub struct WatchArgs {
    /// Poll interval in seconds (60-600). Defaults to the configured interval.
    #[arg(long, short)]
    pub interval: Option<u64>,

    /// Ring the terminal bell with each notification.
    #[arg(long)]
    pub bell: bool,

    /// Poll once and exit.
    #[arg(long)]
    pub once: bool,
}

/// Runs the watch command.
///
/// Failures inside a tick are reported and retried on the next tick; only
/// Ctrl-C ends the loop.
pub async fn run(args: &WatchArgs, cli: &Cli) -> Result<()> {
    let ctx = AppContext::new(cli)?;
    let dispatcher = TerminalDispatcher::new(args.bell);
    let mut settings = AppSettings::default();

    info!(interval = ?args.interval, "Starting watch mode");

    loop {
        let mut notice = None;

        // Keep the last good settings when the file cannot be read.
        match ctx.settings.load_settings().await {
            Ok(loaded) => settings = loaded,
            Err(e) => {
                warn!(error = %e, "Failed to reload settings");
                notice = Some(format!("Settings not reloaded: {e}"));
            }
        }
        let interval = poll_interval(args.interval, &settings);

        let result = ctx.coordinator.fetch(false).await;
        let now = Utc::now();

        match &result {
            Ok(snapshot) => {
                match process_snapshot(ctx.settings.as_ref(), &settings, snapshot, &dispatcher, now)
                    .await
                {
                    Ok(dispatched) => debug!(dispatched, "Tick complete"),
                    Err(e) => {
                        warn!(error = %e, "Failed to save notification state");
                        notice = Some(format!("Notification state not saved: {e:#}"));
                    }
                }
                let view = TickView {
                    snapshot: Some(snapshot.as_ref()),
                    error: None,
                    notice: notice.as_deref(),
                };
                render(cli, &settings, &view, interval, now)?;
            }
            Err(e) => {
                warn!(error = %e, "Refresh failed");
                let cached = ctx.coordinator.cached().await;
                let error = e.to_string();
                let view = TickView {
                    snapshot: cached.as_deref(),
                    error: Some(&error),
                    notice: notice.as_deref(),
                };
                render(cli, &settings, &view, interval, now)?;
            }
        }

        if args.once {
            result?;
            return Ok(());
        }

        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Watch stopped");
                return Ok(());
            }
        }
    }
}

/// Resolves the poll interval, preferring the command line.
fn poll_interval(requested: Option<u64>, settings: &AppSettings) -> Duration {
    match requested {
        Some(secs) => {
            Duration::from_secs(secs.clamp(MIN_REFRESH_INTERVAL_SECS, MAX_REFRESH_INTERVAL_SECS))
        }
        None => settings.refresh_interval(),
    }
}

/// Evaluates a snapshot, delivers events, and persists the new state.
///
/// State is tracked even while notifications are disabled, so turning them
/// back on does not replay crossings that already happened. Returns the
/// number of events delivered.
///
/// An unreadable state file is replaced with fresh state.
///
/// # Errors
///
/// Fails when the new state cannot be written. Events are delivered first.
pub async fn process_snapshot(
    repository: &dyn SettingsRepository,
    settings: &AppSettings,
    snapshot: &UsageSnapshot,
    dispatcher: &dyn NotificationDispatcher,
    now: DateTime<Utc>,
) -> Result<usize> {
    let (prior, recovered) = match repository.load_notification_state().await {
        Ok(state) => (state, false),
        Err(e) => {
            warn!(error = %e, "Notification state unreadable, starting fresh");
            (NotificationState::default(), true)
        }
    };
    let decision = evaluate(snapshot, &settings.notification_thresholds, &prior);

    let delivered = if settings.notifications_enabled && decision.has_events() {
        dispatcher.dispatch(&decision.events, now);
        decision.events.len()
    } else {
        0
    };

    if recovered || decision.state != prior {
        repository.save_notification_state(&decision.state).await?;
    }
    Ok(delivered)
}

/// What one tick has to show.
struct TickView<'a> {
    /// Fresh snapshot, or the cached one when the refresh failed.
    snapshot: Option<&'a UsageSnapshot>,
    /// Refresh failure.
    error: Option<&'a str>,
    /// Settings or state failure that did not stop the tick.
    notice: Option<&'a str>,
}

fn render(
    cli: &Cli,
    settings: &AppSettings,
    view: &TickView<'_>,
    interval: Duration,
    now: DateTime<Utc>,
) -> Result<()> {
    let TickView {
        snapshot,
        error,
        notice,
    } = *view;

    if cli.quiet {
        return Ok(());
    }

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);

            print!("\x1b[2J\x1b[H");
            stdout().flush()?;

            println!(
                "{} - {} (refresh: {}s)",
                formatter.bold("ClaudeMeter Watch"),
                now.with_timezone(&Local).format("%H:%M:%S"),
                interval.as_secs()
            );
            println!("{}", "─".repeat(50));
            println!();

            if let Some(snapshot) = snapshot {
                println!(
                    "{}",
                    formatter.format_snapshot(snapshot, settings.show_sonnet_usage, now)
                );
            }
            if let Some(error) = error {
                if let Some(snapshot) = snapshot {
                    println!();
                    println!("{}", formatter.format_stale_notice(snapshot, now));
                }
                println!("{}", formatter.format_error(error));
            }
            if let Some(notice) = notice {
                println!("{}", formatter.format_error(notice));
            }

            println!();
            println!("Press Ctrl+C to exit");
        }
        OutputFormat::Json => {
            // One document per line.
            let formatter = JsonFormatter::new(false);
            let line = match (snapshot, error) {
                (_, Some(error)) => formatter.format_error(error)?,
                (Some(snapshot), None) => {
                    formatter.format_snapshot(snapshot, settings.show_sonnet_usage, now)?
                }
                (None, None) => return Ok(()),
            };
            println!("{line}");
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Tz;
    use claudemeter_core::{LimitKind, NotificationEvent, NotificationTier, UsageLimit};
    use claudemeter_store::FileSettingsRepository;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingDispatcher {
        events: Mutex<Vec<NotificationEvent>>,
    }

    impl NotificationDispatcher for RecordingDispatcher {
        fn dispatch(&self, events: &[NotificationEvent], _now: DateTime<Utc>) {
            self.events.lock().unwrap().extend_from_slice(events);
        }
    }

    fn snapshot(session: f64) -> UsageSnapshot {
        let reset = Utc.with_ymd_and_hms(2025, 11, 14, 17, 0, 0).unwrap();
        UsageSnapshot {
            session: UsageLimit::new(session, reset),
            weekly: UsageLimit::new(5.0, reset + chrono::Duration::days(3)),
            sonnet: None,
            fetched_at: Utc.with_ymd_and_hms(2025, 11, 14, 12, 0, 0).unwrap(),
            display_timezone: Tz::UTC,
        }
    }

    #[test]
    fn test_poll_interval() {
        let mut settings = AppSettings::default();
        settings.set_refresh_interval(300);

        assert_eq!(poll_interval(None, &settings), Duration::from_secs(300));
        assert_eq!(poll_interval(Some(120), &settings), Duration::from_secs(120));
        assert_eq!(poll_interval(Some(5), &settings), Duration::from_secs(60));
        assert_eq!(poll_interval(Some(9999), &settings), Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_ticks_notify_once_per_tier() {
        let temp_dir = TempDir::new().unwrap();
        let repo = FileSettingsRepository::new(temp_dir.path());
        let settings = AppSettings::default();
        let dispatcher = RecordingDispatcher::default();
        let now = Utc::now();

        for utilization in [40.0, 80.0, 82.0, 95.0, 96.0] {
            process_snapshot(&repo, &settings, &snapshot(utilization), &dispatcher, now)
                .await
                .unwrap();
        }

        let events = dispatcher.events.lock().unwrap();
        let tiers: Vec<_> = events
            .iter()
            .map(|event| match event {
                NotificationEvent::ThresholdCrossed { limit, tier, .. } => (*limit, *tier),
                NotificationEvent::ResetOccurred { .. } => panic!("unexpected reset"),
            })
            .collect();
        assert_eq!(
            tiers,
            vec![
                (LimitKind::Session, NotificationTier::Warning),
                (LimitKind::Session, NotificationTier::Critical),
            ]
        );
    }

    #[tokio::test]
    async fn test_corrupt_state_file_starts_fresh() {
        let temp_dir = TempDir::new().unwrap();
        let repo = FileSettingsRepository::new(temp_dir.path());
        tokio::fs::write(repo.notification_state_path(), "{truncated")
            .await
            .unwrap();
        let dispatcher = RecordingDispatcher::default();

        let delivered = process_snapshot(
            &repo,
            &AppSettings::default(),
            &snapshot(85.0),
            &dispatcher,
            Utc::now(),
        )
        .await
        .unwrap();
        assert_eq!(delivered, 1);

        let state = repo.load_notification_state().await.unwrap();
        assert_eq!(state.session.notified_tier, NotificationTier::Warning);
    }

    #[tokio::test]
    async fn test_failed_state_save_is_reported_after_dispatch() {
        let temp_dir = TempDir::new().unwrap();
        // A directory where the state file belongs cannot be replaced by a file.
        let repo = FileSettingsRepository::new(temp_dir.path());
        tokio::fs::create_dir_all(repo.notification_state_path())
            .await
            .unwrap();
        let dispatcher = RecordingDispatcher::default();

        let result = process_snapshot(
            &repo,
            &AppSettings::default(),
            &snapshot(85.0),
            &dispatcher,
            Utc::now(),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(dispatcher.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_notifications_still_track_state() {
        let temp_dir = TempDir::new().unwrap();
        let repo = FileSettingsRepository::new(temp_dir.path());
        let mut settings = AppSettings::default();
        settings.notifications_enabled = false;
        let dispatcher = RecordingDispatcher::default();
        let now = Utc::now();

        let delivered = process_snapshot(&repo, &settings, &snapshot(85.0), &dispatcher, now)
            .await
            .unwrap();
        assert_eq!(delivered, 0);
        assert!(dispatcher.events.lock().unwrap().is_empty());

        let state = repo.load_notification_state().await.unwrap();
        assert_eq!(state.session.notified_tier, NotificationTier::Warning);

        settings.notifications_enabled = true;
        let delivered = process_snapshot(&repo, &settings, &snapshot(86.0), &dispatcher, now)
            .await
            .unwrap();
        assert_eq!(delivered, 0);
    }
}
