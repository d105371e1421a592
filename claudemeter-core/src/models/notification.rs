//! Notification configuration, persisted state, and events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::usage::LimitKind;
use crate::error::ThresholdError;

// ============================================================================
// Thresholds
// ============================================================================

/// User-configured notification thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationThresholds {
    /// Warning threshold percentage, in `[50, 90]`.
    #[serde(rename = "warning_threshold")]
    pub warning_percent: f64,
    /// Critical threshold percentage, in `[75, 100]`.
    #[serde(rename = "critical_threshold")]
    pub critical_percent: f64,
    /// Whether to notify when a window resets after reaching warning.
    pub notify_on_reset: bool,
}

impl Default for NotificationThresholds {
    fn default() -> Self {
        Self {
            warning_percent: 75.0,
            critical_percent: 90.0,
            notify_on_reset: true,
        }
    }
}

impl NotificationThresholds {
    /// Builds thresholds, rejecting out-of-range or non-ascending values.
    ///
    /// # Errors
    ///
    /// Returns a [`ThresholdError`] describing the first violated bound.
    pub fn new(
        warning_percent: f64,
        critical_percent: f64,
        notify_on_reset: bool,
    ) -> Result<Self, ThresholdError> {
        let thresholds = Self {
            warning_percent,
            critical_percent,
            notify_on_reset,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Checks the configured ranges and ordering.
    ///
    /// # Errors
    ///
    /// Returns a [`ThresholdError`] describing the first violated bound.
    pub fn validate(&self) -> Result<(), ThresholdError> {
        if !(50.0..=90.0).contains(&self.warning_percent) {
            return Err(ThresholdError::WarningOutOfRange(self.warning_percent));
        }
        if !(75.0..=100.0).contains(&self.critical_percent) {
            return Err(ThresholdError::CriticalOutOfRange(self.critical_percent));
        }
        if self.critical_percent <= self.warning_percent {
            return Err(ThresholdError::NotAscending);
        }
        Ok(())
    }

    /// Returns the tier a utilization value falls into.
    pub fn tier_for(&self, utilization: f64) -> NotificationTier {
        if utilization >= self.critical_percent {
            NotificationTier::Critical
        } else if utilization >= self.warning_percent {
            NotificationTier::Warning
        } else {
            NotificationTier::None
        }
    }
}

// ============================================================================
// Tier
// ============================================================================

/// Highest configured threshold reached within a period.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTier {
    /// Below the warning threshold.
    #[default]
    None,
    /// At or above the warning threshold.
    Warning,
    /// At or above the critical threshold.
    Critical,
}

impl fmt::Display for NotificationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

// ============================================================================
// Persisted State
// ============================================================================

/// Tracking for one window within its current period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitNotificationState {
    /// Highest tier already notified for the tracked period.
    pub notified_tier: NotificationTier,
    /// Reset time identifying the tracked period.
    pub tracked_reset_at: Option<DateTime<Utc>>,
    /// True when `tracked_reset_at` was synthesized rather than reported.
    pub tracked_reset_estimated: bool,
    /// Utilization seen at the last evaluation.
    pub last_utilization: Option<f64>,
}

/// Notification bookkeeping that survives restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationState {
    /// Session window tracking.
    pub session: LimitNotificationState,
    /// Weekly window tracking.
    pub weekly: LimitNotificationState,
    /// Sonnet window tracking.
    pub sonnet: LimitNotificationState,
}

impl NotificationState {
    /// Returns the tracking for a window.
    pub fn get(&self, kind: LimitKind) -> &LimitNotificationState {
        match kind {
            LimitKind::Session => &self.session,
            LimitKind::Weekly => &self.weekly,
            LimitKind::Sonnet => &self.sonnet,
        }
    }

    /// Returns mutable tracking for a window.
    pub fn get_mut(&mut self, kind: LimitKind) -> &mut LimitNotificationState {
        match kind {
            LimitKind::Session => &mut self.session,
            LimitKind::Weekly => &mut self.weekly,
            LimitKind::Sonnet => &mut self.sonnet,
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// A notification the dispatcher should deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// Utilization reached a higher tier than previously notified this period.
    ThresholdCrossed {
        /// Window that crossed.
        limit: LimitKind,
        /// Tier reached.
        tier: NotificationTier,
        /// Current utilization.
        utilization: f64,
        /// When the window resets.
        reset_at: DateTime<Utc>,
    },
    /// A window rolled over after having reached the warning tier.
    ResetOccurred {
        /// Window that reset.
        limit: LimitKind,
        /// Utilization before the reset.
        previous_utilization: f64,
        /// Reset time of the new period.
        reset_at: DateTime<Utc>,
    },
}

impl NotificationEvent {
    /// Returns the window this event concerns.
    pub fn limit(&self) -> LimitKind {
        match self {
            Self::ThresholdCrossed { limit, .. } | Self::ResetOccurred { limit, .. } => *limit,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
