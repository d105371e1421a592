//! Config command - manage configuration.

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use claudemeter_core::NotificationThresholds;
use claudemeter_store::{AppSettings, FileSettingsRepository, SettingsRepository};
use tracing::info;

use super::settings_repository;
use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Set the refresh interval in seconds (60-600).
    Interval {
        /// Interval in seconds. Out-of-range values are clamped.
        seconds: u64,
    },

    /// Set notification thresholds.
    Thresholds {
        /// Warning threshold percentage (50-90).
        #[arg(long)]
        warning: Option<f64>,

        /// Critical threshold percentage (75-100).
        #[arg(long)]
        critical: Option<f64>,

        /// Notify when a window resets after reaching warning.
        #[arg(long)]
        notify_on_reset: Option<Toggle>,
    },

    /// Show or hide the Sonnet window.
    Sonnet {
        /// on or off.
        state: Toggle,
    },

    /// Enable or disable notifications.
    Notifications {
        /// on or off.
        state: Toggle,
    },

    /// Reset settings and notification state to defaults.
    Reset,
}

/// On/off switch value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    /// Enabled.
    On,
    /// Disabled.
    Off,
}

impl Toggle {
    fn enabled(self) -> bool {
        self == Self::On
    }
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    let repository = settings_repository(cli);

    match &args.action {
        ConfigAction::Show => show_config(&repository, cli).await,
        ConfigAction::Path => show_paths(&repository, cli),
        ConfigAction::Interval { seconds } => {
            let settings = update(&repository, |s| s.set_refresh_interval(*seconds)).await?;
            info!(interval = settings.refresh_interval, "Refresh interval updated");
            report(cli, &format!("Refresh interval set to {}s", settings.refresh_interval));
            Ok(())
        }
        ConfigAction::Thresholds {
            warning,
            critical,
            notify_on_reset,
        } => set_thresholds(&repository, cli, *warning, *critical, *notify_on_reset).await,
        ConfigAction::Sonnet { state } => {
            update(&repository, |s| s.show_sonnet_usage = state.enabled()).await?;
            report(cli, &format!("Sonnet usage display: {}", on_off(state.enabled())));
            Ok(())
        }
        ConfigAction::Notifications { state } => {
            update(&repository, |s| s.notifications_enabled = state.enabled()).await?;
            report(cli, &format!("Notifications: {}", on_off(state.enabled())));
            Ok(())
        }
        ConfigAction::Reset => reset_config(&repository, cli).await,
    }
}

/// Loads settings, applies `change`, and saves the result.
async fn update(
    repository: &FileSettingsRepository,
    change: impl FnOnce(&mut AppSettings),
) -> Result<AppSettings> {
    let mut settings = repository.load_settings().await?;
    change(&mut settings);
    repository.save_settings(&settings).await?;
    Ok(settings)
}

async fn show_config(repository: &FileSettingsRepository, cli: &Cli) -> Result<()> {
    let settings = repository.load_settings().await?;

    match cli.format {
        OutputFormat::Text => {
            let thresholds = &settings.notification_thresholds;
            println!("ClaudeMeter Configuration");
            println!("{}", "─".repeat(40));
            println!();
            println!("Refresh interval:   {}s", settings.refresh_interval().as_secs());
            println!("Notifications:      {}", on_off(settings.notifications_enabled));
            println!("Warning threshold:  {:.0}%", thresholds.warning_percent);
            println!("Critical threshold: {:.0}%", thresholds.critical_percent);
            println!("Notify on reset:    {}", on_off(thresholds.notify_on_reset));
            println!("Show Sonnet usage:  {}", on_off(settings.show_sonnet_usage));
            println!(
                "Organization:       {}",
                settings.cached_organization_id.as_deref().unwrap_or("(not resolved)")
            );
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&settings)?);
        }
    }

    Ok(())
}

fn show_paths(repository: &FileSettingsRepository, cli: &Cli) -> Result<()> {
    let config_dir = repository.dir();
    let settings_path = repository.settings_path();
    let state_path = repository.notification_state_path();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:         {}", config_dir.display());
            println!("Settings file:      {}", settings_path.display());
            println!("Notification state: {}", state_path.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "settings_file": settings_path.display().to_string(),
                "notification_state_file": state_path.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

async fn set_thresholds(
    repository: &FileSettingsRepository,
    cli: &Cli,
    warning: Option<f64>,
    critical: Option<f64>,
    notify_on_reset: Option<Toggle>,
) -> Result<()> {
    let mut settings = repository.load_settings().await?;
    let current = settings.notification_thresholds;

    let thresholds = NotificationThresholds::new(
        warning.unwrap_or(current.warning_percent),
        critical.unwrap_or(current.critical_percent),
        notify_on_reset.map_or(current.notify_on_reset, Toggle::enabled),
    )?;

    settings.notification_thresholds = thresholds;
    repository.save_settings(&settings).await?;

    info!(
        warning = thresholds.warning_percent,
        critical = thresholds.critical_percent,
        notify_on_reset = thresholds.notify_on_reset,
        "Thresholds updated"
    );
    report(
        cli,
        &format!(
            "Thresholds set: warning {:.0}%, critical {:.0}%, notify on reset {}",
            thresholds.warning_percent,
            thresholds.critical_percent,
            on_off(thresholds.notify_on_reset)
        ),
    );

    Ok(())
}

async fn reset_config(repository: &FileSettingsRepository, cli: &Cli) -> Result<()> {
    let mut removed = false;

    for path in [repository.settings_path(), repository.notification_state_path()] {
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
            info!(path = %path.display(), "Removed");
            removed = true;
        }
    }

    if removed {
        report(cli, "Configuration reset to defaults");
    } else {
        report(cli, "No configuration file to reset");
    }

    Ok(())
}

fn report(cli: &Cli, message: &str) {
    if !cli.quiet {
        println!("{message}");
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_update_persists_change() {
        let temp_dir = TempDir::new().unwrap();
        let repository = FileSettingsRepository::new(temp_dir.path());

        let updated = update(&repository, |s| s.set_refresh_interval(5000))
            .await
            .unwrap();
        assert_eq!(updated.refresh_interval, 600);

        let loaded = repository.load_settings().await.unwrap();
        assert_eq!(loaded.refresh_interval, 600);
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_thresholds() {
        let temp_dir = TempDir::new().unwrap();
        let repository = FileSettingsRepository::new(temp_dir.path());

        let result = update(&repository, |s| {
            s.notification_thresholds.warning_percent = 95.0;
        })
        .await;
        assert!(result.is_err());
        assert!(!repository.settings_path().exists());
    }

    #[test]
    fn test_toggle() {
        assert!(Toggle::On.enabled());
        assert!(!Toggle::Off.enabled());
        assert_eq!(on_off(true), "on");
    }
}
