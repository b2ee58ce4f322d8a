//! Lifecycle decision engine
//!
//! [`decide`] is a pure function: given the action date currently recorded on
//! a resource, the recorded notification history and the policy limits, it
//! computes the next action date, which notification (if any) fires on this
//! run and the resulting [`Classification`]. It performs no I/O; the sweeper
//! turns its output into tag writes, actions and notices.

use chrono::NaiveDate;
use reaper_api::Classification;
use reaper_util::{add_days, days_until, format_optional_date};
use tracing::debug;

/// One rank of the notification schedule as seen on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationRecord {
    /// Date the notification was sent, if it has been
    pub recorded: Option<NaiveDate>,
    /// Days before the action date this notification becomes due
    pub lead_days: u32,
}

impl NotificationRecord {
    pub fn new(recorded: Option<NaiveDate>, lead_days: u32) -> Self {
        Self {
            recorded,
            lead_days,
        }
    }
}

/// Result of one engine evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub classification: Classification,
    /// Action date to persist
    pub action_date: NaiveDate,
    /// New recorded value per rank, same order as the input
    pub notifications: Vec<Option<NaiveDate>>,
    /// Rank that fired, for bump and send classifications
    pub rank: Option<usize>,
}

impl Decision {
    fn new(
        classification: Classification,
        action_date: NaiveDate,
        notifications: Vec<Option<NaiveDate>>,
    ) -> Self {
        Self {
            classification,
            action_date,
            notifications,
            rank: None,
        }
    }

    fn with_rank(mut self, rank: usize) -> Self {
        self.rank = Some(rank);
        self
    }
}

/// Decide what happens to one resource on `run_date`.
///
/// `notifications` must be ordered by descending lead time and `default_days`
/// must not exceed `max_days`; both are caller contracts and panic when
/// violated.
pub fn decide(
    current: Option<NaiveDate>,
    notifications: &[NotificationRecord],
    default_days: u32,
    max_days: u32,
    run_date: NaiveDate,
) -> Decision {
    assert!(
        notifications
            .windows(2)
            .all(|pair| pair[0].lead_days >= pair[1].lead_days),
        "notification schedule must be sorted by descending lead time"
    );
    assert!(
        default_days <= max_days,
        "default_days ({default_days}) must not exceed max_days ({max_days})"
    );

    debug!(
        current = %format_optional_date(current),
        recorded = ?notifications.iter().map(|n| n.recorded).collect::<Vec<_>>(),
        default_days,
        max_days,
        run_date = %run_date,
        "Evaluating lifecycle decision"
    );

    let unchanged: Vec<Option<NaiveDate>> = notifications.iter().map(|n| n.recorded).collect();
    let cleared = vec![None; notifications.len()];

    let Some(current) = current else {
        return Decision::new(
            Classification::AddActionDate,
            add_days(run_date, default_days),
            cleared,
        );
    };

    let remaining = days_until(run_date, current);

    if remaining > i64::from(max_days) {
        return Decision::new(
            Classification::ResetActionDate,
            add_days(run_date, max_days),
            cleared,
        );
    }

    if remaining <= 0 {
        // One extra day per rank still owed, so late warnings stay staggered
        return match notifications.iter().position(|n| n.recorded.is_none()) {
            Some(rank) => {
                let mut records = unchanged;
                records[rank] = Some(run_date);
                let owed = u32::try_from(notifications.len() - rank).unwrap_or(u32::MAX);
                Decision::new(
                    Classification::PastBumpNotification,
                    add_days(run_date, owed),
                    records,
                )
                .with_rank(rank)
            }
            None => Decision::new(Classification::CompleteAction, run_date, unchanged),
        };
    }

    let due = notifications
        .iter()
        .position(|n| n.recorded.is_none() && remaining <= i64::from(n.lead_days));
    if let Some(rank) = due {
        let mut records = unchanged;
        records[rank] = Some(run_date);
        return Decision::new(Classification::SendNotification, current, records).with_rank(rank);
    }

    let any_recorded = notifications.iter().any(|n| n.recorded.is_some());
    let longest_lead = notifications.first().map_or(0, |n| i64::from(n.lead_days));
    if any_recorded && remaining > longest_lead {
        return Decision::new(Classification::ResetNotifications, current, cleared);
    }

    Decision::new(Classification::LogNoNotification, current, unchanged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const DEFAULT_DAYS: u32 = 31;
    const MAX_DAYS: u32 = 62;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 15).unwrap()
    }

    fn day(offset: i64) -> NaiveDate {
        today() + Duration::days(offset)
    }

    /// Ranks at 15/7/2 days with the given recorded values
    fn schedule(recorded: [Option<NaiveDate>; 3]) -> Vec<NotificationRecord> {
        recorded
            .into_iter()
            .zip([15, 7, 2])
            .map(|(r, lead)| NotificationRecord::new(r, lead))
            .collect()
    }

    fn run(current: Option<NaiveDate>, recorded: [Option<NaiveDate>; 3]) -> Decision {
        decide(current, &schedule(recorded), DEFAULT_DAYS, MAX_DAYS, today())
    }

    const NONE: [Option<NaiveDate>; 3] = [None, None, None];

    fn all_sent() -> [Option<NaiveDate>; 3] {
        [Some(day(-1)); 3]
    }

    #[test]
    fn complete_when_due_and_all_sent() {
        let d = run(Some(today()), all_sent());
        assert_eq!(d.classification, Classification::CompleteAction);
        assert_eq!(d.action_date, today());
        assert_eq!(d.notifications, all_sent().to_vec());
        assert_eq!(d.rank, None);
    }

    #[test]
    fn missing_action_date_is_added_and_ranks_cleared() {
        let d = run(None, all_sent());
        assert_eq!(d.classification, Classification::AddActionDate);
        assert_eq!(d.action_date, day(31));
        assert_eq!(d.notifications, vec![None; 3]);
    }

    #[test]
    fn far_future_date_is_pulled_to_max() {
        let d = run(Some(day(80)), all_sent());
        assert_eq!(d.classification, Classification::ResetActionDate);
        assert_eq!(d.action_date, day(62));
        assert_eq!(d.notifications, vec![None; 3]);
    }

    #[test]
    fn max_boundary_is_not_reset() {
        let d = run(Some(day(62)), NONE);
        assert_eq!(d.classification, Classification::LogNoNotification);
        assert_eq!(d.action_date, day(62));
    }

    #[test]
    fn future_date_outside_windows_logs() {
        let d = run(Some(day(31)), NONE);
        assert_eq!(d.classification, Classification::LogNoNotification);
        assert_eq!(d.action_date, day(31));
        assert_eq!(d.notifications, vec![None; 3]);
    }

    #[test]
    fn past_date_bumps_one_day_per_missing_rank() {
        let d = run(Some(day(-1)), NONE);
        assert_eq!(d.classification, Classification::PastBumpNotification);
        assert_eq!(d.rank, Some(0));
        assert_eq!(d.action_date, day(3));
        assert_eq!(d.notifications, vec![Some(today()), None, None]);

        let d = run(Some(day(-1)), [Some(day(-1)), None, None]);
        assert_eq!(d.rank, Some(1));
        assert_eq!(d.action_date, day(2));
        assert_eq!(d.notifications, vec![Some(day(-1)), Some(today()), None]);

        let d = run(Some(day(-1)), [Some(day(-1)), Some(day(-1)), None]);
        assert_eq!(d.rank, Some(2));
        assert_eq!(d.action_date, day(1));
        assert_eq!(
            d.notifications,
            vec![Some(day(-1)), Some(day(-1)), Some(today())]
        );
    }

    #[test]
    fn past_bump_keeps_other_ranks() {
        let d = run(Some(day(-5)), [None, Some(day(-3)), None]);
        assert_eq!(d.classification, Classification::PastBumpNotification);
        assert_eq!(d.rank, Some(0));
        assert_eq!(d.notifications, vec![Some(today()), Some(day(-3)), None]);
    }

    #[test]
    fn past_date_with_all_sent_completes_today() {
        let d = run(Some(day(-1)), all_sent());
        assert_eq!(d.classification, Classification::CompleteAction);
        assert_eq!(d.action_date, today());
        assert_eq!(d.notifications, all_sent().to_vec());
    }

    #[test]
    fn sends_first_open_notification() {
        let d = run(Some(day(8)), NONE);
        assert_eq!(d.classification, Classification::SendNotification);
        assert_eq!(d.rank, Some(0));
        assert_eq!(d.action_date, day(8));
        assert_eq!(d.notifications, vec![Some(today()), None, None]);

        let d = run(Some(day(5)), [Some(day(-1)), None, None]);
        assert_eq!(d.rank, Some(1));
        assert_eq!(d.action_date, day(5));
        assert_eq!(d.notifications, vec![Some(day(-1)), Some(today()), None]);

        let d = run(Some(day(1)), [Some(day(-1)), Some(day(-1)), None]);
        assert_eq!(d.rank, Some(2));
        assert_eq!(d.action_date, day(1));
    }

    #[test]
    fn window_opens_when_remaining_equals_lead() {
        let d = run(Some(day(15)), NONE);
        assert_eq!(d.classification, Classification::SendNotification);
        assert_eq!(d.rank, Some(0));

        let d = run(Some(day(16)), NONE);
        assert_eq!(d.classification, Classification::LogNoNotification);
    }

    #[test]
    fn never_skips_a_rank() {
        // Two days out both rank 0 and rank 2 windows are open; rank 0 goes first
        let d = run(Some(day(2)), NONE);
        assert_eq!(d.classification, Classification::SendNotification);
        assert_eq!(d.rank, Some(0));
        assert_eq!(d.notifications, vec![Some(today()), None, None]);
    }

    #[test]
    fn already_sent_notifications_log() {
        let d = run(Some(day(8)), [Some(day(-1)), None, None]);
        assert_eq!(d.classification, Classification::LogNoNotification);
        assert_eq!(d.notifications, vec![Some(day(-1)), None, None]);

        let d = run(Some(day(5)), [Some(day(-1)), Some(day(-1)), None]);
        assert_eq!(d.classification, Classification::LogNoNotification);

        let d = run(Some(day(1)), all_sent());
        assert_eq!(d.classification, Classification::LogNoNotification);
        assert_eq!(d.action_date, day(1));
        assert_eq!(d.notifications, all_sent().to_vec());
    }

    #[test]
    fn pushed_out_date_resets_notifications() {
        let d = run(Some(day(31)), all_sent());
        assert_eq!(d.classification, Classification::ResetNotifications);
        assert_eq!(d.action_date, day(31));
        assert_eq!(d.notifications, vec![None; 3]);

        let d = run(Some(day(31)), [Some(day(-10)), None, None]);
        assert_eq!(d.classification, Classification::ResetNotifications);
    }

    #[test]
    fn reset_requires_a_recorded_rank() {
        let d = run(Some(day(40)), NONE);
        assert_eq!(d.classification, Classification::LogNoNotification);
    }

    #[test]
    fn empty_schedule() {
        let d = decide(Some(day(-2)), &[], DEFAULT_DAYS, MAX_DAYS, today());
        assert_eq!(d.classification, Classification::CompleteAction);
        assert_eq!(d.action_date, today());
        assert!(d.notifications.is_empty());

        let d = decide(Some(day(10)), &[], DEFAULT_DAYS, MAX_DAYS, today());
        assert_eq!(d.classification, Classification::LogNoNotification);

        let d = decide(None, &[], 0, 0, today());
        assert_eq!(d.classification, Classification::AddActionDate);
        assert_eq!(d.action_date, today());
    }

    #[test]
    fn added_date_follows_default_days() {
        for default_days in [0, 1, 14, 31, 62] {
            let d = decide(None, &schedule(NONE), default_days, MAX_DAYS, today());
            assert_eq!(d.action_date, today() + Duration::days(default_days.into()));
        }
    }

    #[test]
    fn ceiling_is_exact_for_any_excess() {
        for offset in [63, 64, 100, 3650] {
            let d = run(Some(day(offset)), [Some(day(-1)), None, None]);
            assert_eq!(d.classification, Classification::ResetActionDate);
            assert_eq!(d.action_date, day(62));
        }
    }

    #[test]
    fn log_and_complete_are_fixed_points() {
        let cases = [
            (Some(day(8)), [Some(day(-1)), None, None]),
            (Some(day(40)), NONE),
            (Some(today()), all_sent()),
            (Some(day(-3)), all_sent()),
        ];

        for (current, recorded) in cases {
            let first = run(current, recorded);
            assert!(matches!(
                first.classification,
                Classification::LogNoNotification | Classification::CompleteAction
            ));

            let fed_back: Vec<NotificationRecord> = first
                .notifications
                .iter()
                .zip([15, 7, 2])
                .map(|(r, lead)| NotificationRecord::new(*r, lead))
                .collect();
            let second = decide(
                Some(first.action_date),
                &fed_back,
                DEFAULT_DAYS,
                MAX_DAYS,
                today(),
            );
            assert_eq!(second.classification, first.classification);
            assert_eq!(second.action_date, first.action_date);
        }
    }

    #[test]
    fn daily_simulation_runs_full_lifecycle() {
        let leads = [15u32, 7, 2];
        let mut action_date = None;
        let mut recorded: Vec<Option<NaiveDate>> = vec![None; 3];
        let mut seen = Vec::new();

        for offset in 0..40 {
            let run_date = day(offset);
            let records: Vec<NotificationRecord> = recorded
                .iter()
                .zip(leads)
                .map(|(r, lead)| NotificationRecord::new(*r, lead))
                .collect();
            let d = decide(action_date, &records, DEFAULT_DAYS, MAX_DAYS, run_date);
            if d.classification != Classification::LogNoNotification {
                seen.push((offset, d.classification, d.rank));
            }
            if d.classification == Classification::CompleteAction {
                break;
            }
            action_date = Some(d.action_date);
            recorded = d.notifications;
        }

        assert_eq!(
            seen,
            vec![
                (0, Classification::AddActionDate, None),
                (16, Classification::SendNotification, Some(0)),
                (24, Classification::SendNotification, Some(1)),
                (29, Classification::SendNotification, Some(2)),
                (31, Classification::CompleteAction, None),
            ]
        );
    }

    #[test]
    #[should_panic(expected = "descending lead time")]
    fn unsorted_schedule_panics() {
        let records = [NotificationRecord::new(None, 2), NotificationRecord::new(None, 15)];
        decide(None, &records, DEFAULT_DAYS, MAX_DAYS, today());
    }

    #[test]
    #[should_panic(expected = "must not exceed max_days")]
    fn default_above_max_panics() {
        decide(None, &schedule(NONE), 70, MAX_DAYS, today());
    }
}
