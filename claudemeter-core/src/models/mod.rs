//! Domain models for `ClaudeMeter`.
//!
//! ## Submodules
//!
//! - [`usage`] - Usage types (UsageSnapshot, UsageLimit, Severity, LimitKind)
//! - [`notification`] - Thresholds, persisted notification state, events
//! - [`account`] - SessionKey and Organization

mod account;
mod notification;
mod usage;

pub use account::{Organization, SESSION_KEY_PREFIX, SessionKey};
pub use notification::{
    LimitNotificationState, NotificationEvent, NotificationState, NotificationThresholds,
    NotificationTier,
};
pub use usage::{
    LimitKind, STALENESS_THRESHOLD_SECS, Severity, UsageLimit, UsageSnapshot,
    describe_relative, display_timezone_from_env,
};
