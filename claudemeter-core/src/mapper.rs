//! Usage API payload and its conversion to a [`UsageSnapshot`].
//!
//! # Response Format
//!
//! ```json
//! {
//!   "five_hour": {"utilization": 25.0, "resets_at": "2025-11-14T17:00:00.123456+00:00"},
//!   "seven_day": {"utilization": 45.0, "resets_at": "2025-11-18T09:00:00.000000+00:00"},
//!   "seven_day_sonnet": {"utilization": 30.0, "resets_at": null}
//! }
//! ```
//!
//! The session and weekly reset timestamps are required: a wrong reset time
//! would corrupt every later notification decision, so the whole payload is
//! rejected instead. The Sonnet window is best-effort and falls back to an
//! estimated reset a week out.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::MappingError;
use crate::models::{UsageLimit, UsageSnapshot};

/// Days ahead used when the Sonnet window has no usable reset time.
pub const ESTIMATED_RESET_DAYS: i64 = 7;

// ============================================================================
// Wire Types
// ============================================================================

/// Raw response from the usage endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageApiResponse {
    /// 5-hour session window.
    #[serde(default)]
    pub five_hour: Option<RawUsageLimit>,
    /// 7-day window (all models).
    #[serde(default)]
    pub seven_day: Option<RawUsageLimit>,
    /// 7-day Sonnet window.
    #[serde(default)]
    pub seven_day_sonnet: Option<RawUsageLimit>,
}

/// A single window as sent on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawUsageLimit {
    /// Utilization percentage.
    #[serde(default)]
    pub utilization: Option<f64>,
    /// Reset time as an ISO-8601 string, may be null.
    #[serde(default)]
    pub resets_at: Option<String>,
}

// ============================================================================
// Timestamp Parsing
// ============================================================================

/// Parses a reset timestamp in strict ISO-8601 form.
///
/// Accepts `YYYY-MM-DDTHH:MM:SS.fff` followed by `Z` or a `±HH:MM` offset.
/// Timestamps without fractional seconds are rejected.
///
/// # Errors
///
/// Returns [`MappingError::InvalidDateFormat`] for anything else.
pub fn parse_reset_timestamp(raw: &str) -> Result<DateTime<Utc>, MappingError> {
    let parsed =
        DateTime::parse_from_rfc3339(raw).map_err(|_| MappingError::InvalidDateFormat)?;

    // RFC 3339 puts the optional fraction right after the 19-byte "date T time" prefix.
    if raw.as_bytes().get(19) != Some(&b'.') {
        return Err(MappingError::InvalidDateFormat);
    }

    Ok(parsed.with_timezone(&Utc))
}

// ============================================================================
// Mapping
// ============================================================================

impl UsageApiResponse {
    /// Maps this payload to a snapshot stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::MissingCriticalField`] naming the session or
    /// weekly field that is absent or unparseable.
    pub fn to_snapshot(&self, display_timezone: Tz) -> Result<UsageSnapshot, MappingError> {
        self.to_snapshot_at(display_timezone, Utc::now())
    }

    /// Maps this payload using `now` as the fetch time and fallback baseline.
    ///
    /// # Errors
    ///
    /// See [`UsageApiResponse::to_snapshot`].
    pub fn to_snapshot_at(
        &self,
        display_timezone: Tz,
        now: DateTime<Utc>,
    ) -> Result<UsageSnapshot, MappingError> {
        let session = required_limit(self.five_hour.as_ref(), "five_hour")?;
        let weekly = required_limit(self.seven_day.as_ref(), "seven_day")?;
        let sonnet = self
            .seven_day_sonnet
            .as_ref()
            .and_then(|raw| optional_limit(raw, now));

        debug!(
            session = session.utilization,
            weekly = weekly.utilization,
            has_sonnet = sonnet.is_some(),
            "Usage response mapped"
        );

        Ok(UsageSnapshot {
            session,
            weekly,
            sonnet,
            fetched_at: now,
            display_timezone,
        })
    }
}

fn required_limit(raw: Option<&RawUsageLimit>, name: &str) -> Result<UsageLimit, MappingError> {
    let raw = raw.ok_or_else(|| MappingError::missing(name))?;

    let utilization = raw
        .utilization
        .ok_or_else(|| MappingError::missing(format!("{name}.utilization")))?;

    let reset_at = raw
        .resets_at
        .as_deref()
        .ok_or(MappingError::InvalidDateFormat)
        .and_then(parse_reset_timestamp)
        .map_err(|e| {
            warn!(field = name, resets_at = ?raw.resets_at, error = %e, "Rejecting usage response");
            MappingError::missing(format!("{name}.resets_at"))
        })?;

    Ok(UsageLimit::new(utilization, reset_at))
}

fn optional_limit(raw: &RawUsageLimit, now: DateTime<Utc>) -> Option<UsageLimit> {
    let Some(utilization) = raw.utilization else {
        debug!("Sonnet window has no utilization, skipping");
        return None;
    };

    match raw.resets_at.as_deref().map(parse_reset_timestamp) {
        Some(Ok(reset_at)) => Some(UsageLimit::new(utilization, reset_at)),
        other => {
            debug!(resets_at = ?raw.resets_at, parsed = ?other, "Estimating Sonnet reset time");
            Some(UsageLimit::estimated(
                utilization,
                now + Duration::days(ESTIMATED_RESET_DAYS),
            ))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
