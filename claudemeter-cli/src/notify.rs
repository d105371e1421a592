//! Notification delivery for the watch loop.
//!
//! The decision of what to notify lives in `claudemeter_core::notifications`;
//! this module only renders and delivers the resulting events.

use chrono::{DateTime, Utc};
use claudemeter_core::{NotificationEvent, NotificationTier, describe_relative};
use std::io::Write;
use tracing::info;

/// Delivers notification events.
pub trait NotificationDispatcher {
    /// Delivers `events` in order.
    fn dispatch(&self, events: &[NotificationEvent], now: DateTime<Utc>);
}

/// Title and body of a rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub title: String,
    pub body: String,
}

/// Renders the user-facing copy for an event.
pub fn render(event: &NotificationEvent, now: DateTime<Utc>) -> Message {
    match event {
        NotificationEvent::ThresholdCrossed {
            limit,
            tier,
            utilization,
            reset_at,
        } => {
            let level = match tier {
                NotificationTier::Critical => "critical",
                _ => "high",
            };
            Message {
                title: format!("{limit} usage {level}: {utilization:.0}%"),
                body: format!(
                    "Your {} window resets {}.",
                    limit.display_name().to_lowercase(),
                    describe_relative(*reset_at - now)
                ),
            }
        }
        NotificationEvent::ResetOccurred {
            limit,
            previous_utilization,
            ..
        } => Message {
            title: format!("{limit} usage reset"),
            body: format!(
                "Your {} window has reset (was {previous_utilization:.0}%).",
                limit.display_name().to_lowercase()
            ),
        },
    }
}

// ============================================================================
// Terminal Dispatcher
// ============================================================================

/// Writes notifications to stderr, optionally ringing the terminal bell.
pub struct TerminalDispatcher {
    bell: bool,
}

impl TerminalDispatcher {
    /// Creates a dispatcher.
    pub fn new(bell: bool) -> Self {
        Self { bell }
    }
}

impl NotificationDispatcher for TerminalDispatcher {
    fn dispatch(&self, events: &[NotificationEvent], now: DateTime<Utc>) {
        let mut stderr = std::io::stderr().lock();
        for event in events {
            let message = render(event, now);
            info!(limit = ?event.limit(), title = %message.title, "Delivering notification");
            let bell = if self.bell { "\x07" } else { "" };
            // A closed stderr leaves nothing to report to.
            let _ = writeln!(stderr, "{bell}» {}\n  {}", message.title, message.body);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
