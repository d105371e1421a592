//! Usage-related types.
//!
//! This module contains the values produced by a successful fetch:
//! - [`UsageLimit`] - One quota window (utilization plus reset time)
//! - [`UsageSnapshot`] - Session, weekly, and optional Sonnet windows
//! - [`Severity`] - Display band derived from utilization
//! - [`LimitKind`] - Identity of a tracked window

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default age after which a cached snapshot is considered stale.
pub const STALENESS_THRESHOLD_SECS: i64 = 30;

// ============================================================================
// Limit Kind
// ============================================================================

/// Identifies one of the tracked usage windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    /// 5-hour rolling session window.
    Session,
    /// 7-day window across all models.
    Weekly,
    /// 7-day Sonnet-specific window.
    Sonnet,
}

impl LimitKind {
    /// All tracked windows, in display order.
    pub const ALL: [LimitKind; 3] = [LimitKind::Session, LimitKind::Weekly, LimitKind::Sonnet];

    /// Returns the display label for this window.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Session => "Session",
            Self::Weekly => "Weekly",
            Self::Sonnet => "Sonnet",
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// Severity
// ============================================================================

/// Display band for a utilization value.
///
/// Bands are half-open: `[0, 50)` safe, `[50, 80)` warning, `[80, ∞)` critical.
/// These are fixed and independent of the configured notification thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Below 50%.
    Safe,
    /// 50% up to 80%.
    Warning,
    /// 80% and above.
    Critical,
}

impl Severity {
    /// Classifies a utilization percentage.
    pub fn from_utilization(utilization: f64) -> Self {
        if utilization >= 80.0 {
            Self::Critical
        } else if utilization >= 50.0 {
            Self::Warning
        } else {
            Self::Safe
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

// ============================================================================
// Usage Limit
// ============================================================================

/// A single usage window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLimit {
    /// Percentage of the quota consumed. Not clamped; may exceed 100.
    pub utilization: f64,
    /// When this window resets.
    pub reset_at: DateTime<Utc>,
    /// True when `reset_at` was synthesized because upstream omitted it.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reset_estimated: bool,
}

impl UsageLimit {
    /// Creates a limit with a reset time reported by upstream.
    pub fn new(utilization: f64, reset_at: DateTime<Utc>) -> Self {
        Self {
            utilization,
            reset_at,
            reset_estimated: false,
        }
    }

    /// Creates a limit whose reset time is an estimate.
    pub fn estimated(utilization: f64, reset_at: DateTime<Utc>) -> Self {
        Self {
            utilization,
            reset_at,
            reset_estimated: true,
        }
    }

    /// Returns the display band for this limit.
    pub fn severity(&self) -> Severity {
        Severity::from_utilization(self.utilization)
    }

    /// Returns true once the quota is used up.
    pub fn is_exceeded(&self) -> bool {
        self.utilization >= 100.0
    }

    /// Returns true if the reset time has passed but usage has not dropped yet.
    pub fn is_resetting(&self, now: DateTime<Utc>) -> bool {
        self.reset_at < now && self.utilization > 0.0
    }

    /// Returns the time left until reset (negative once passed).
    pub fn time_until_reset(&self, now: DateTime<Utc>) -> Duration {
        self.reset_at - now
    }

    /// Human-readable reset time relative to `now`, e.g. "in 2 hours".
    pub fn reset_description(&self, now: DateTime<Utc>) -> String {
        describe_relative(self.time_until_reset(now))
    }
}

/// Formats a signed duration as "in N units" or "N units ago".
pub fn describe_relative(delta: Duration) -> String {
    let future = delta >= Duration::zero();
    let secs = delta.num_seconds().abs();

    if secs < 60 {
        return if future {
            "in less than a minute".to_string()
        } else {
            "just now".to_string()
        };
    }

    let amount = if secs < 3600 {
        plural(secs / 60, "minute")
    } else if secs < 86_400 {
        plural(secs / 3600, "hour")
    } else {
        plural(secs / 86_400, "day")
    };

    if future {
        format!("in {amount}")
    } else {
        format!("{amount} ago")
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

// ============================================================================
// Usage Snapshot
// ============================================================================

/// Complete usage data across all limit types.
///
/// A new fetch always produces a new snapshot; snapshots are never patched
/// in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// 5-hour rolling session usage.
    pub session: UsageLimit,
    /// 7-day usage across all models.
    pub weekly: UsageLimit,
    /// 7-day Sonnet-specific usage, if the account reports it.
    pub sonnet: Option<UsageLimit>,
    /// When this snapshot was mapped (local wall clock, not upstream time).
    pub fetched_at: DateTime<Utc>,
    /// Timezone used for presenting reset times.
    pub display_timezone: Tz,
}

impl UsageSnapshot {
    /// Returns the limit for a window, if present.
    pub fn limit(&self, kind: LimitKind) -> Option<&UsageLimit> {
        match kind {
            LimitKind::Session => Some(&self.session),
            LimitKind::Weekly => Some(&self.weekly),
            LimitKind::Sonnet => self.sonnet.as_ref(),
        }
    }

    /// Iterates over the windows present in this snapshot.
    pub fn limits(&self) -> impl Iterator<Item = (LimitKind, &UsageLimit)> {
        LimitKind::ALL
            .into_iter()
            .filter_map(|kind| self.limit(kind).map(|limit| (kind, limit)))
    }

    /// Returns the status shown in the menu bar (session window).
    pub fn primary_status(&self) -> Severity {
        self.session.severity()
    }

    /// Returns the highest utilization across all windows.
    pub fn max_utilization(&self) -> f64 {
        self.limits()
            .map(|(_, limit)| limit.utilization)
            .fold(0.0_f64, f64::max)
    }

    /// Returns how old this snapshot is.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.fetched_at
    }

    /// Returns true if this snapshot is older than `threshold`.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.age(now) > threshold
    }

    /// Human-readable staleness indicator.
    pub fn freshness_description(&self, now: DateTime<Utc>) -> String {
        let elapsed = self.age(now).num_seconds();
        if elapsed < 60 {
            "just now".to_string()
        } else if elapsed < 3600 {
            format!("{} minutes ago", elapsed / 60)
        } else {
            format!("{} hours ago", elapsed / 3600)
        }
    }

    /// Returns a window's reset time in the display timezone.
    pub fn local_reset_at(&self, kind: LimitKind) -> Option<DateTime<Tz>> {
        self.limit(kind)
            .map(|limit| limit.reset_at.with_timezone(&self.display_timezone))
    }
}

/// Resolves the display timezone from the `TZ` environment variable.
///
/// Falls back to UTC when `TZ` is unset or not an IANA name.
pub fn display_timezone_from_env() -> Tz {
    std::env::var("TZ")
        .ok()
        .and_then(|name| name.trim_start_matches(':').parse::<Tz>().ok())
        .unwrap_or(Tz::UTC)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 14, h, 0, 0).unwrap()
    }

    fn snapshot(session: f64, weekly: f64, sonnet: Option<f64>) -> UsageSnapshot {
        UsageSnapshot {
            session: UsageLimit::new(session, at(17)),
            weekly: UsageLimit::new(weekly, at(23)),
            sonnet: sonnet.map(|u| UsageLimit::new(u, at(23))),
            fetched_at: at(12),
            display_timezone: Tz::UTC,
        }
    }

    #[test]
    fn test_severity_bands_are_half_open() {
        assert_eq!(Severity::from_utilization(0.0), Severity::Safe);
        assert_eq!(Severity::from_utilization(49.99), Severity::Safe);
        assert_eq!(Severity::from_utilization(50.0), Severity::Warning);
        assert_eq!(Severity::from_utilization(79.99), Severity::Warning);
        assert_eq!(Severity::from_utilization(80.0), Severity::Critical);
        assert_eq!(Severity::from_utilization(250.0), Severity::Critical);
    }

    #[test]
    fn test_limit_exceeded_and_resetting() {
        let limit = UsageLimit::new(100.0, at(11));
        assert!(limit.is_exceeded());
        assert!(limit.is_resetting(at(12)));

        let fresh = UsageLimit::new(0.0, at(11));
        assert!(!fresh.is_resetting(at(12)), "zero usage is not resetting");

        let pending = UsageLimit::new(40.0, at(13));
        assert!(!pending.is_resetting(at(12)));
        assert!(!pending.is_exceeded());
    }

    #[test]
    fn test_reset_description() {
        let limit = UsageLimit::new(10.0, at(14));
        assert_eq!(limit.reset_description(at(12)), "in 2 hours");
        assert_eq!(limit.reset_description(at(13)), "in 1 hour");
        assert_eq!(limit.reset_description(at(16)), "2 hours ago");

        let soon = UsageLimit::new(10.0, at(12) + Duration::seconds(30));
        assert_eq!(soon.reset_description(at(12)), "in less than a minute");

        let later = UsageLimit::new(10.0, at(12) + Duration::days(3));
        assert_eq!(later.reset_description(at(12)), "in 3 days");
    }

    #[test]
    fn test_snapshot_limits_skip_missing_sonnet() {
        let without = snapshot(10.0, 20.0, None);
        let kinds: Vec<_> = without.limits().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![LimitKind::Session, LimitKind::Weekly]);

        let with = snapshot(10.0, 20.0, Some(30.0));
        assert_eq!(with.limits().count(), 3);
        assert_eq!(with.max_utilization(), 30.0);
    }

    #[test]
    fn test_snapshot_staleness() {
        let snap = snapshot(10.0, 20.0, None);
        let threshold = Duration::seconds(STALENESS_THRESHOLD_SECS);

        assert!(!snap.is_stale(at(12) + Duration::seconds(10), threshold));
        assert!(snap.is_stale(at(12) + Duration::seconds(31), threshold));
    }

    #[test]
    fn test_freshness_description() {
        let snap = snapshot(10.0, 20.0, None);
        assert_eq!(snap.freshness_description(at(12) + Duration::seconds(5)), "just now");
        assert_eq!(
            snap.freshness_description(at(12) + Duration::minutes(5)),
            "5 minutes ago"
        );
        assert_eq!(snap.freshness_description(at(15)), "3 hours ago");
    }

    #[test]
    fn test_primary_status_follows_session() {
        assert_eq!(snapshot(85.0, 10.0, None).primary_status(), Severity::Critical);
        assert_eq!(snapshot(10.0, 95.0, None).primary_status(), Severity::Safe);
    }

    #[test]
    fn test_local_reset_at_uses_display_timezone() {
        let mut snap = snapshot(10.0, 20.0, None);
        snap.display_timezone = chrono_tz::Europe::Berlin;
        let local = snap.local_reset_at(LimitKind::Session).unwrap();
        assert_eq!(local.format("%H:%M").to_string(), "18:00");
        assert!(snap.local_reset_at(LimitKind::Sonnet).is_none());
    }
}
