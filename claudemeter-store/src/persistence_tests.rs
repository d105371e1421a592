//! Persistence round-trip and edge case tests.
//!
//! Tests file I/O, JSON persistence, and the settings repository.

use std::path::PathBuf;
use tempfile::TempDir;

use crate::error::StoreError;
use crate::persistence::{ensure_dir, load_json, load_json_or_default, save_json};
use crate::settings::{AppSettings, FileSettingsRepository, SettingsRepository};
use claudemeter_core::{NotificationState, NotificationTier, ThresholdError};

// ============================================================================
// JSON Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_save_and_load_json_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("settings.json");

    let mut settings = AppSettings::default();
    settings.set_refresh_interval(180);
    settings.cached_organization_id = Some("org-1".to_string());

    save_json(&file_path, &settings).await.unwrap();
    let loaded: AppSettings = load_json(&file_path).await.unwrap();

    assert_eq!(loaded, settings);
}

#[tokio::test]
async fn test_save_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let nested_path = temp_dir.path().join("deeply").join("nested").join("test.json");

    save_json(&nested_path, &serde_json::json!({"key": "value"}))
        .await
        .unwrap();
    assert!(nested_path.exists());
    assert!(!nested_path.with_extension("json.tmp").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_saved_files_are_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("claudemeter");
    let file_path = dir.join("settings.json");

    save_json(&file_path, &AppSettings::default()).await.unwrap();

    let file_mode = std::fs::metadata(&file_path).unwrap().permissions().mode();
    let dir_mode = std::fs::metadata(&dir).unwrap().permissions().mode();
    assert_eq!(file_mode & 0o777, 0o600);
    assert_eq!(dir_mode & 0o777, 0o700);
}

#[tokio::test]
async fn test_load_nonexistent_file() {
    let file_path = PathBuf::from("/nonexistent/path/settings.json");

    let result: Result<AppSettings, _> = load_json(&file_path).await;
    assert!(matches!(result, Err(StoreError::Io(_))));

    let defaulted: AppSettings = load_json_or_default(&file_path).await.unwrap();
    assert_eq!(defaulted, AppSettings::default());
}

#[tokio::test]
async fn test_corrupt_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("settings.json");
    tokio::fs::write(&file_path, "{not json").await.unwrap();

    let result: Result<AppSettings, _> = load_json_or_default(&file_path).await;
    assert!(matches!(result, Err(StoreError::Serialization(_))));
}

#[tokio::test]
async fn test_ensure_dir_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let dir_path = temp_dir.path().join("test_dir");

    ensure_dir(&dir_path).await.unwrap();
    ensure_dir(&dir_path).await.unwrap();

    assert!(dir_path.is_dir());
}

// ============================================================================
// Settings Repository Tests
// ============================================================================

#[tokio::test]
async fn test_repository_defaults_when_empty() {
    let temp_dir = TempDir::new().unwrap();
    let repo = FileSettingsRepository::new(temp_dir.path());

    assert_eq!(repo.load_settings().await.unwrap(), AppSettings::default());
    assert_eq!(
        repo.load_notification_state().await.unwrap(),
        NotificationState::default()
    );
}

#[tokio::test]
async fn test_repository_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let repo = FileSettingsRepository::new(temp_dir.path());

    let mut settings = AppSettings::default();
    settings.show_sonnet_usage = true;
    settings.is_first_launch = false;
    repo.save_settings(&settings).await.unwrap();

    let mut state = NotificationState::default();
    state.weekly.notified_tier = NotificationTier::Warning;
    state.weekly.last_utilization = Some(77.5);
    repo.save_notification_state(&state).await.unwrap();

    let reopened = FileSettingsRepository::new(temp_dir.path());
    assert_eq!(reopened.load_settings().await.unwrap(), settings);
    assert_eq!(reopened.load_notification_state().await.unwrap(), state);
    assert!(reopened.notification_state_path().exists());
}

#[tokio::test]
async fn test_repository_rejects_invalid_thresholds() {
    let temp_dir = TempDir::new().unwrap();
    let repo = FileSettingsRepository::new(temp_dir.path());

    let mut settings = AppSettings::default();
    settings.notification_thresholds.warning_percent = 95.0;

    let result = repo.save_settings(&settings).await;
    assert!(matches!(
        result,
        Err(StoreError::InvalidThresholds(ThresholdError::WarningOutOfRange(_)))
    ));
    assert!(!repo.settings_path().exists());
}
