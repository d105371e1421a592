//! Notification decisions.
//!
//! [`evaluate`] compares a fresh snapshot against the persisted
//! [`NotificationState`] and decides which events fire. It is pure: the
//! caller persists the returned state and hands the events to a dispatcher.
//!
//! Each window is tracked independently. A window's period is identified by
//! its reset time; when that changes the window has rolled over and its
//! tier marker starts again from [`NotificationTier::None`]. Within a period a
//! tier fires at most once.
//!
//! An estimated reset time moves with every fetch, so it cannot identify a
//! period by value. While either side is estimated the period ends once the
//! fetch time reaches the tracked reset, and a reported reset replaces an
//! estimated one without a rollover.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::models::{
    LimitKind, LimitNotificationState, NotificationEvent, NotificationState,
    NotificationThresholds, NotificationTier, UsageLimit, UsageSnapshot,
};

/// Reset times closer than this are the same period.
///
/// Upstream re-renders the fractional seconds of a reset timestamp on every
/// request; real rollovers move it by hours.
pub const PERIOD_TOLERANCE_SECS: i64 = 60;

/// Output of [`evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDecision {
    /// Events to dispatch, in window order.
    pub events: Vec<NotificationEvent>,
    /// State to persist in place of the prior state.
    pub state: NotificationState,
}

impl NotificationDecision {
    /// Returns true if anything should be dispatched.
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }
}

/// Decides which notifications fire for `snapshot`.
///
/// Windows missing from the snapshot keep their prior tracking untouched.
pub fn evaluate(
    snapshot: &UsageSnapshot,
    thresholds: &NotificationThresholds,
    prior: &NotificationState,
) -> NotificationDecision {
    let mut state = prior.clone();
    let mut events = Vec::new();

    for (kind, limit) in snapshot.limits() {
        let next = evaluate_limit(
            kind,
            limit,
            snapshot.fetched_at,
            thresholds,
            prior.get(kind),
            &mut events,
        );
        *state.get_mut(kind) = next;
    }

    NotificationDecision { events, state }
}

fn evaluate_limit(
    kind: LimitKind,
    limit: &UsageLimit,
    fetched_at: DateTime<Utc>,
    thresholds: &NotificationThresholds,
    tracked: &LimitNotificationState,
    events: &mut Vec<NotificationEvent>,
) -> LimitNotificationState {
    let rolled_over = match tracked.tracked_reset_at {
        None => true,
        Some(previous) if limit.reset_estimated || tracked.tracked_reset_estimated => {
            fetched_at >= previous
        }
        Some(previous) => !same_period(previous, limit.reset_at),
    };

    let recorded = if rolled_over {
        if let (Some(_), Some(previous_utilization)) =
            (tracked.tracked_reset_at, tracked.last_utilization)
        {
            debug!(limit = ?kind, previous_utilization, reset_at = %limit.reset_at, "Period rolled over");
            if thresholds.notify_on_reset && previous_utilization >= thresholds.warning_percent {
                info!(limit = ?kind, previous_utilization, "Reset notification");
                events.push(NotificationEvent::ResetOccurred {
                    limit: kind,
                    previous_utilization,
                    reset_at: limit.reset_at,
                });
            }
        }
        NotificationTier::None
    } else {
        tracked.notified_tier
    };

    let current = thresholds.tier_for(limit.utilization);
    if current > recorded {
        info!(limit = ?kind, tier = %current, utilization = limit.utilization, "Threshold crossed");
        events.push(NotificationEvent::ThresholdCrossed {
            limit: kind,
            tier: current,
            utilization: limit.utilization,
            reset_at: limit.reset_at,
        });
    }

    // A drifting estimate keeps the anchor of the period it belongs to.
    let (tracked_reset_at, tracked_reset_estimated) = match tracked.tracked_reset_at {
        Some(previous) if limit.reset_estimated && !rolled_over => {
            (Some(previous), tracked.tracked_reset_estimated)
        }
        _ => (Some(limit.reset_at), limit.reset_estimated),
    };

    LimitNotificationState {
        notified_tier: recorded.max(current),
        tracked_reset_at,
        tracked_reset_estimated,
        last_utilization: Some(limit.utilization),
    }
}

fn same_period(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    (a - b).abs() < Duration::seconds(PERIOD_TOLERANCE_SECS)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Tz;

    fn t(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 14, h, 0, 0).unwrap()
    }

    fn thresholds() -> NotificationThresholds {
        NotificationThresholds::new(75.0, 90.0, true).unwrap()
    }

    /// Snapshot with the session window at `utilization` resetting at `reset`;
    /// weekly stays quiet.
    fn session_at(utilization: f64, reset: DateTime<Utc>) -> UsageSnapshot {
        UsageSnapshot {
            session: UsageLimit::new(utilization, reset),
            weekly: UsageLimit::new(0.0, t(23)),
            sonnet: None,
            fetched_at: t(10),
            display_timezone: Tz::UTC,
        }
    }

    fn prior_tracking(reset: DateTime<Utc>) -> NotificationState {
        let mut state = NotificationState::default();
        state.session.tracked_reset_at = Some(reset);
        state.weekly.tracked_reset_at = Some(t(23));
        state
    }

    #[test]
    fn test_warning_then_critical_then_nothing() {
        let prior = prior_tracking(t(12));

        let first = evaluate(&session_at(80.0, t(12)), &thresholds(), &prior);
        assert_eq!(
            first.events,
            vec![NotificationEvent::ThresholdCrossed {
                limit: LimitKind::Session,
                tier: NotificationTier::Warning,
                utilization: 80.0,
                reset_at: t(12),
            }]
        );

        let second = evaluate(&session_at(95.0, t(12)), &thresholds(), &first.state);
        assert_eq!(second.events.len(), 1);
        assert!(matches!(
            second.events[0],
            NotificationEvent::ThresholdCrossed { tier: NotificationTier::Critical, .. }
        ));

        let third = evaluate(&session_at(96.0, t(12)), &thresholds(), &second.state);
        assert!(third.events.is_empty());
        assert_eq!(third.state.session.notified_tier, NotificationTier::Critical);
    }

    #[test]
    fn test_rollover_emits_reset_and_clears_marker() {
        let prior = prior_tracking(t(12));
        let warned = evaluate(&session_at(80.0, t(12)), &thresholds(), &prior).state;

        let rolled = evaluate(&session_at(5.0, t(17)), &thresholds(), &warned);
        assert_eq!(
            rolled.events,
            vec![NotificationEvent::ResetOccurred {
                limit: LimitKind::Session,
                previous_utilization: 80.0,
                reset_at: t(17),
            }]
        );
        assert_eq!(rolled.state.session.notified_tier, NotificationTier::None);
        assert_eq!(rolled.state.session.tracked_reset_at, Some(t(17)));

        let again = evaluate(&session_at(80.0, t(17)), &thresholds(), &rolled.state);
        assert_eq!(again.events.len(), 1);
        assert!(matches!(
            again.events[0],
            NotificationEvent::ThresholdCrossed { tier: NotificationTier::Warning, .. }
        ));
    }

    #[test]
    fn test_rollover_straight_into_warning_fires_both() {
        let prior = prior_tracking(t(12));
        let warned = evaluate(&session_at(85.0, t(12)), &thresholds(), &prior).state;

        let decision = evaluate(&session_at(80.0, t(17)), &thresholds(), &warned);
        assert_eq!(decision.events.len(), 2);
        assert!(matches!(decision.events[0], NotificationEvent::ResetOccurred { .. }));
        assert!(matches!(
            decision.events[1],
            NotificationEvent::ThresholdCrossed { tier: NotificationTier::Warning, .. }
        ));
    }

    #[test]
    fn test_rollover_without_notify_on_reset() {
        let quiet = NotificationThresholds::new(75.0, 90.0, false).unwrap();
        let prior = prior_tracking(t(12));
        let warned = evaluate(&session_at(80.0, t(12)), &quiet, &prior).state;

        let rolled = evaluate(&session_at(5.0, t(17)), &quiet, &warned);
        assert!(rolled.events.is_empty());
        assert_eq!(rolled.state.session.notified_tier, NotificationTier::None);
    }

    #[test]
    fn test_rollover_below_warning_is_silent() {
        let prior = prior_tracking(t(12));
        let low = evaluate(&session_at(40.0, t(12)), &thresholds(), &prior).state;

        let rolled = evaluate(&session_at(1.0, t(17)), &thresholds(), &low);
        assert!(rolled.events.is_empty());
    }

    #[test]
    fn test_first_run_never_emits_reset() {
        let decision = evaluate(
            &session_at(92.0, t(12)),
            &thresholds(),
            &NotificationState::default(),
        );
        assert_eq!(decision.events.len(), 1);
        assert!(matches!(
            decision.events[0],
            NotificationEvent::ThresholdCrossed { tier: NotificationTier::Critical, .. }
        ));
        assert_eq!(decision.state.session.tracked_reset_at, Some(t(12)));
        assert_eq!(decision.state.weekly.tracked_reset_at, Some(t(23)));
    }

    #[test]
    fn test_reset_jitter_is_same_period() {
        let prior = prior_tracking(t(12));
        let warned = evaluate(&session_at(80.0, t(12)), &thresholds(), &prior).state;

        let jittered = t(12) + Duration::milliseconds(640);
        let decision = evaluate(&session_at(82.0, jittered), &thresholds(), &warned);
        assert!(decision.events.is_empty());
        assert_eq!(decision.state.session.notified_tier, NotificationTier::Warning);
    }

    #[test]
    fn test_drop_within_period_does_not_refire() {
        let prior = prior_tracking(t(12));
        let warned = evaluate(&session_at(80.0, t(12)), &thresholds(), &prior).state;
        let dipped = evaluate(&session_at(60.0, t(12)), &thresholds(), &warned).state;
        assert_eq!(dipped.session.notified_tier, NotificationTier::Warning);

        let back = evaluate(&session_at(81.0, t(12)), &thresholds(), &dipped);
        assert!(back.events.is_empty());
    }

    #[test]
    fn test_limits_tracked_independently() {
        let prior = prior_tracking(t(12));
        let mut snapshot = session_at(80.0, t(12));
        snapshot.weekly = UsageLimit::new(91.0, t(23));

        let decision = evaluate(&snapshot, &thresholds(), &prior);
        let limits: Vec<_> = decision.events.iter().map(NotificationEvent::limit).collect();
        assert_eq!(limits, vec![LimitKind::Session, LimitKind::Weekly]);
        assert_eq!(decision.state.session.notified_tier, NotificationTier::Warning);
        assert_eq!(decision.state.weekly.notified_tier, NotificationTier::Critical);
    }

    #[test]
    fn test_estimated_sonnet_reset_drift_is_same_period() {
        let mut snapshot = session_at(10.0, t(12));
        snapshot.sonnet = Some(UsageLimit::estimated(80.0, t(20)));
        let first = evaluate(&snapshot, &thresholds(), &prior_tracking(t(12)));
        assert_eq!(first.events.len(), 1);
        assert_eq!(first.state.sonnet.tracked_reset_at, Some(t(20)));

        snapshot.sonnet = Some(UsageLimit::estimated(81.0, t(21)));
        let second = evaluate(&snapshot, &thresholds(), &first.state);
        assert!(second.events.is_empty());
        assert_eq!(second.state.sonnet.tracked_reset_at, Some(t(20)));
        assert_eq!(second.state.sonnet.notified_tier, NotificationTier::Warning);
    }

    /// Snapshot fetched at `fetched_at` with an estimated Sonnet window.
    fn sonnet_estimated_at(utilization: f64, fetched_at: DateTime<Utc>) -> UsageSnapshot {
        let mut snapshot = session_at(10.0, fetched_at + Duration::hours(3));
        snapshot.weekly = UsageLimit::new(0.0, fetched_at + Duration::days(2));
        snapshot.fetched_at = fetched_at;
        snapshot.sonnet = Some(UsageLimit::estimated(utilization, fetched_at + Duration::days(7)));
        snapshot
    }

    #[test]
    fn test_estimated_sonnet_rolls_over_once_estimate_passes() {
        let day0 = t(0);
        let first = evaluate(
            &sonnet_estimated_at(80.0, day0),
            &thresholds(),
            &NotificationState::default(),
        );
        assert_eq!(first.state.sonnet.notified_tier, NotificationTier::Warning);
        assert!(first.state.sonnet.tracked_reset_estimated);

        let week4 = day0 + Duration::weeks(3);
        let reset = evaluate(&sonnet_estimated_at(5.0, week4), &thresholds(), &first.state);
        assert_eq!(
            reset.events,
            vec![NotificationEvent::ResetOccurred {
                limit: LimitKind::Sonnet,
                previous_utilization: 80.0,
                reset_at: week4 + Duration::days(7),
            }]
        );
        assert_eq!(reset.state.sonnet.notified_tier, NotificationTier::None);
        assert_eq!(reset.state.sonnet.tracked_reset_at, Some(week4 + Duration::days(7)));

        let later = week4 + Duration::hours(1);
        let crossing = evaluate(&sonnet_estimated_at(85.0, later), &thresholds(), &reset.state);
        assert_eq!(crossing.events.len(), 1);
        assert!(matches!(
            crossing.events[0],
            NotificationEvent::ThresholdCrossed {
                limit: LimitKind::Sonnet,
                tier: NotificationTier::Warning,
                ..
            }
        ));
    }

    #[test]
    fn test_reported_reset_replaces_estimate_without_rollover() {
        let mut snapshot = session_at(10.0, t(12));
        snapshot.sonnet = Some(UsageLimit::estimated(80.0, t(20)));
        let estimated = evaluate(&snapshot, &thresholds(), &prior_tracking(t(12)));
        assert_eq!(estimated.state.sonnet.notified_tier, NotificationTier::Warning);

        snapshot.sonnet = Some(UsageLimit::new(82.0, t(22)));
        let reported = evaluate(&snapshot, &thresholds(), &estimated.state);
        assert!(reported.events.is_empty());
        assert_eq!(reported.state.sonnet.notified_tier, NotificationTier::Warning);
        assert_eq!(reported.state.sonnet.tracked_reset_at, Some(t(22)));
        assert!(!reported.state.sonnet.tracked_reset_estimated);

        // From here on the reported reset identifies the period as usual.
        snapshot.sonnet = Some(UsageLimit::new(5.0, t(23) + Duration::days(7)));
        let rolled = evaluate(&snapshot, &thresholds(), &reported.state);
        assert!(matches!(rolled.events[0], NotificationEvent::ResetOccurred { .. }));
    }

    #[test]
    fn test_missing_sonnet_keeps_prior_tracking() {
        let mut prior = prior_tracking(t(12));
        prior.sonnet.notified_tier = NotificationTier::Critical;
        prior.sonnet.tracked_reset_at = Some(t(22));

        let decision = evaluate(&session_at(10.0, t(12)), &thresholds(), &prior);
        assert_eq!(decision.state.sonnet, prior.sonnet);
    }

    #[test]
    fn test_utilization_over_hundred_is_critical() {
        let decision = evaluate(&session_at(250.0, t(12)), &thresholds(), &prior_tracking(t(12)));
        assert!(matches!(
            decision.events[0],
            NotificationEvent::ThresholdCrossed { tier: NotificationTier::Critical, .. }
        ));
    }
}
