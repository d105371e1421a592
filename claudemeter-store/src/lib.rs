// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `ClaudeMeter` Store
//!
//! State and persistence for the `ClaudeMeter` usage monitor.
//!
//! This crate provides:
//!
//! - **RefreshCoordinator**: Cached snapshot with single-flight fetching
//! - **SettingsRepository**: Settings and notification state on disk
//! - **CredentialStore**: Session key in the system keychain
//! - **Persistence**: File I/O helpers for JSON data
//!
//! ## Usage
//!
//! ```ignore
//! use claudemeter_fetch::ClaudeWebClient;
//! use claudemeter_store::{FileSettingsRepository, RefreshCoordinator, SystemKeychain};
//! use std::sync::Arc;
//!
//! let coordinator = RefreshCoordinator::new(
//!     Arc::new(ClaudeWebClient::new()?),
//!     Arc::new(FileSettingsRepository::default_location()),
//!     Arc::new(SystemKeychain::default()),
//! );
//!
//! let snapshot = coordinator.fetch(false).await?;
//! println!("Session: {:.0}%", snapshot.session.utilization);
//! ```

pub mod coordinator;
pub mod error;
pub mod keychain;
pub mod persistence;
pub mod settings;

pub use coordinator::{CoordinatorOptions, RefreshCoordinator, needs_refresh};
pub use error::{CredentialError, StoreError};
pub use keychain::{CredentialStore, DEFAULT_ACCOUNT, KEYCHAIN_SERVICE, SystemKeychain};
pub use persistence::{default_config_dir, load_json, load_json_or_default, save_json};
pub use settings::{
    AppSettings, FileSettingsRepository, MAX_REFRESH_INTERVAL_SECS, MIN_REFRESH_INTERVAL_SECS,
    SettingsRepository,
};

#[cfg(test)]
mod persistence_tests;
