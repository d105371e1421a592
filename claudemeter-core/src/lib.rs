// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `ClaudeMeter` Core
//!
//! Domain types and pure decision logic for the `ClaudeMeter` usage monitor.
//!
//! Nothing in this crate performs I/O. Fetching lives in `claudemeter-fetch`,
//! persistence and refresh coordination in `claudemeter-store`.
//!
//! ## Key Types
//!
//! ### Usage
//! - [`UsageSnapshot`] - Point-in-time usage for all windows
//! - [`UsageLimit`] - One window's utilization and reset time
//! - [`Severity`] - Fixed display bands (safe/warning/critical)
//!
//! ### Notifications
//! - [`NotificationThresholds`] - User-configured warning/critical percentages
//! - [`NotificationState`] - Per-window bookkeeping that survives restarts
//! - [`notifications::evaluate`] - Decides which events fire for a snapshot
//!
//! ### Account
//! - [`SessionKey`] - Format-checked credential
//! - [`Organization`] - Account scope for usage requests
//!
//! ## Usage
//!
//! ```rust
//! use claudemeter_core::mapper::UsageApiResponse;
//! use claudemeter_core::notifications::evaluate;
//! use claudemeter_core::{NotificationState, NotificationThresholds};
//!
//! let json = r#"{
//!     "five_hour": {"utilization": 80.0, "resets_at": "2025-11-14T17:00:00.000Z"},
//!     "seven_day": {"utilization": 10.0, "resets_at": "2025-11-18T09:00:00.000Z"}
//! }"#;
//! let response: UsageApiResponse = serde_json::from_str(json).unwrap();
//! let snapshot = response.to_snapshot(chrono_tz::Tz::UTC).unwrap();
//!
//! let decision = evaluate(
//!     &snapshot,
//!     &NotificationThresholds::default(),
//!     &NotificationState::default(),
//! );
//! assert_eq!(decision.events.len(), 1);
//! ```

pub mod error;
pub mod mapper;
pub mod models;
pub mod notifications;

// Re-export error types
pub use error::{MappingError, SessionKeyError, ThresholdError};

// Re-export all model types
pub use models::{
    // Usage types
    LimitKind,
    STALENESS_THRESHOLD_SECS,
    Severity,
    UsageLimit,
    UsageSnapshot,
    describe_relative,
    display_timezone_from_env,
    // Notification types
    LimitNotificationState,
    NotificationEvent,
    NotificationState,
    NotificationThresholds,
    NotificationTier,
    // Account types
    Organization,
    SESSION_KEY_PREFIX,
    SessionKey,
};

pub use notifications::{NotificationDecision, evaluate};
