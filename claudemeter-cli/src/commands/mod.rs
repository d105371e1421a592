//! CLI command implementations.

pub mod config;
pub mod key;
pub mod notify;
pub mod usage;
pub mod watch;

use anyhow::{Context, Result};
use claudemeter_fetch::ClaudeWebClient;
use claudemeter_store::{FileSettingsRepository, RefreshCoordinator, SystemKeychain};
use std::sync::Arc;

use crate::Cli;

/// Settings repository for the selected config directory.
pub fn settings_repository(cli: &Cli) -> FileSettingsRepository {
    match &cli.config_dir {
        Some(dir) => FileSettingsRepository::new(dir),
        None => FileSettingsRepository::default_location(),
    }
}

/// Collaborators shared by the commands that fetch usage.
pub struct AppContext {
    /// Settings and notification state.
    pub settings: Arc<FileSettingsRepository>,
    /// Cached, single-flight usage access.
    pub coordinator: RefreshCoordinator,
}

impl AppContext {
    /// Wires the production client, keychain, and settings together.
    pub fn new(cli: &Cli) -> Result<Self> {
        let settings = Arc::new(settings_repository(cli));
        let api = ClaudeWebClient::new().context("Failed to create HTTP client")?;
        let coordinator = RefreshCoordinator::new(
            Arc::new(api),
            settings.clone(),
            Arc::new(SystemKeychain::default()),
        );
        Ok(Self {
            settings,
            coordinator,
        })
    }
}
