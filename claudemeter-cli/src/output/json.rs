//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use claudemeter_core::{LimitKind, Severity, UsageLimit, UsageSnapshot};
use serde::{Serialize, Serializer};

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for a snapshot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotOutput {
    pub session: WindowOutput,
    pub weekly: WindowOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sonnet: Option<WindowOutput>,
    pub status: Severity,
    #[serde(serialize_with = "serialize_datetime")]
    pub fetched_at: DateTime<Utc>,
    pub freshness: String,
    pub timezone: String,
}

/// A single usage window.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowOutput {
    pub utilization: f64,
    pub severity: Severity,
    #[serde(serialize_with = "serialize_datetime")]
    pub resets_at: DateTime<Utc>,
    pub reset_description: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub reset_estimated: bool,
}

/// Error output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub error: String,
}

// ============================================================================
// Serialization helpers
// ============================================================================

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_datetime<S>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&dt.to_rfc3339())
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a snapshot.
    pub fn format_snapshot(
        &self,
        snapshot: &UsageSnapshot,
        show_sonnet: bool,
        now: DateTime<Utc>,
    ) -> Result<String> {
        self.format(&snapshot_to_output(snapshot, show_sonnet, now))
    }

    /// Formats an error.
    pub fn format_error(&self, error: &str) -> Result<String> {
        self.format(&ErrorOutput {
            error: error.to_string(),
        })
    }
}

/// Converts a snapshot to output.
pub fn snapshot_to_output(
    snapshot: &UsageSnapshot,
    show_sonnet: bool,
    now: DateTime<Utc>,
) -> SnapshotOutput {
    SnapshotOutput {
        session: window_to_output(&snapshot.session, now),
        weekly: window_to_output(&snapshot.weekly, now),
        sonnet: snapshot
            .limit(LimitKind::Sonnet)
            .filter(|_| show_sonnet)
            .map(|limit| window_to_output(limit, now)),
        status: snapshot.primary_status(),
        fetched_at: snapshot.fetched_at,
        freshness: snapshot.freshness_description(now),
        timezone: snapshot.display_timezone.name().to_string(),
    }
}

fn window_to_output(limit: &UsageLimit, now: DateTime<Utc>) -> WindowOutput {
    WindowOutput {
        utilization: limit.utilization,
        severity: limit.severity(),
        resets_at: limit.reset_at,
        reset_description: limit.reset_description(now),
        reset_estimated: limit.reset_estimated,
    }
}
