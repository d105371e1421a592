//! User settings and their persistence.
//!
//! Settings and notification state live in two JSON files in the same
//! directory. Callers re-read settings when they need them, so an edit made
//! by another process takes effect on the next refresh.

use async_trait::async_trait;
use claudemeter_core::{NotificationState, NotificationThresholds, ThresholdError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::error::StoreError;
use crate::persistence::{default_config_dir, load_json_or_default, save_json};

/// Shortest allowed poll interval in seconds.
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 60;

/// Longest allowed poll interval in seconds.
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 600;

/// Settings file name.
pub const SETTINGS_FILE: &str = "settings.json";

/// Notification state file name.
pub const NOTIFICATION_STATE_FILE: &str = "notification_state.json";

// ============================================================================
// Settings Types
// ============================================================================

/// User preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Poll interval in seconds, see [`AppSettings::refresh_interval`].
    pub refresh_interval: u64,

    /// Whether threshold and reset notifications are delivered.
    pub notifications_enabled: bool,

    /// Warning/critical thresholds.
    pub notification_thresholds: NotificationThresholds,

    /// True until the first session key has been stored.
    pub is_first_launch: bool,

    /// Organization usage is fetched for, resolved on first fetch.
    pub cached_organization_id: Option<String>,

    /// Whether the Sonnet window is shown.
    pub show_sonnet_usage: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            refresh_interval: MIN_REFRESH_INTERVAL_SECS,
            notifications_enabled: true,
            notification_thresholds: NotificationThresholds::default(),
            is_first_launch: true,
            cached_organization_id: None,
            show_sonnet_usage: false,
        }
    }
}

impl AppSettings {
    /// Sets the poll interval, clamped to 60..=600 seconds.
    pub fn set_refresh_interval(&mut self, secs: u64) {
        self.refresh_interval = clamp_interval(secs);
    }

    /// Returns the poll interval, clamped even if the file was edited by hand.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(clamp_interval(self.refresh_interval))
    }

    /// Checks the notification thresholds.
    ///
    /// # Errors
    ///
    /// Returns the first violated threshold bound.
    pub fn validate(&self) -> Result<(), ThresholdError> {
        self.notification_thresholds.validate()
    }
}

fn clamp_interval(secs: u64) -> u64 {
    secs.clamp(MIN_REFRESH_INTERVAL_SECS, MAX_REFRESH_INTERVAL_SECS)
}

// ============================================================================
// Repository
// ============================================================================

/// Durable storage for settings and notification state.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Loads settings, returning defaults if none were saved.
    async fn load_settings(&self) -> Result<AppSettings, StoreError>;

    /// Saves settings after validating them.
    async fn save_settings(&self, settings: &AppSettings) -> Result<(), StoreError>;

    /// Loads notification state, returning an empty state if none was saved.
    async fn load_notification_state(&self) -> Result<NotificationState, StoreError>;

    /// Saves notification state.
    async fn save_notification_state(&self, state: &NotificationState) -> Result<(), StoreError>;
}

/// JSON file implementation of [`SettingsRepository`].
#[derive(Debug, Clone)]
pub struct FileSettingsRepository {
    dir: PathBuf,
}

impl FileSettingsRepository {
    /// Creates a repository rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates a repository in the platform config directory.
    pub fn default_location() -> Self {
        Self::new(default_config_dir())
    }

    /// Returns the directory both files live in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the settings file path.
    pub fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    /// Returns the notification state file path.
    pub fn notification_state_path(&self) -> PathBuf {
        self.dir.join(NOTIFICATION_STATE_FILE)
    }
}

#[async_trait]
impl SettingsRepository for FileSettingsRepository {
    async fn load_settings(&self) -> Result<AppSettings, StoreError> {
        load_json_or_default(&self.settings_path()).await
    }

    #[instrument(skip_all)]
    async fn save_settings(&self, settings: &AppSettings) -> Result<(), StoreError> {
        settings.validate()?;
        save_json(&self.settings_path(), settings).await?;
        info!(path = %self.settings_path().display(), "Settings saved");
        Ok(())
    }

    async fn load_notification_state(&self) -> Result<NotificationState, StoreError> {
        load_json_or_default(&self.notification_state_path()).await
    }

    async fn save_notification_state(&self, state: &NotificationState) -> Result<(), StoreError> {
        save_json(&self.notification_state_path(), state).await?;
        debug!("Notification state saved");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.refresh_interval(), Duration::from_secs(60));
        assert!(settings.notifications_enabled);
        assert!(settings.is_first_launch);
        assert!(!settings.show_sonnet_usage);
        assert!(settings.cached_organization_id.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_refresh_interval_clamped() {
        let mut settings = AppSettings::default();
        settings.set_refresh_interval(5);
        assert_eq!(settings.refresh_interval, 60);
        settings.set_refresh_interval(3600);
        assert_eq!(settings.refresh_interval, 600);
        settings.set_refresh_interval(300);
        assert_eq!(settings.refresh_interval(), Duration::from_secs(300));

        settings.refresh_interval = 1;
        assert_eq!(settings.refresh_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"refresh_interval": 120, "notification_thresholds": {"warning_threshold": 60}}"#;
        let settings: AppSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.refresh_interval, 120);
        assert_eq!(settings.notification_thresholds.warning_percent, 60.0);
        assert_eq!(settings.notification_thresholds.critical_percent, 90.0);
        assert!(settings.notifications_enabled);
    }
}
