//! Notification schedules
//!
//! A schedule is the list of warnings sent before an action date, one per
//! rank. Rank 0 is always the warning with the longest lead time; the type
//! sorts itself on construction so no caller can hand the engine an
//! unordered schedule.

use serde::{Deserialize, Serialize};

/// One warning: fires `lead_days` before the action date, recorded in `tag`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledNotification {
    pub tag: String,
    pub lead_days: u32,
}

/// Notifications ordered by descending lead time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ScheduledNotification>", into = "Vec<ScheduledNotification>")]
pub struct NotificationSchedule(Vec<ScheduledNotification>);

impl NotificationSchedule {
    pub fn new(mut entries: Vec<ScheduledNotification>) -> Self {
        // Ties break on tag name so equal lead times keep a stable rank
        entries.sort_by(|a, b| b.lead_days.cmp(&a.lead_days).then_with(|| a.tag.cmp(&b.tag)));
        Self(entries)
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(tag, lead_days)| ScheduledNotification {
                    tag: tag.into(),
                    lead_days,
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScheduledNotification> {
        self.0.iter()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|n| n.tag.as_str())
    }
}

impl From<Vec<ScheduledNotification>> for NotificationSchedule {
    fn from(entries: Vec<ScheduledNotification>) -> Self {
        Self::new(entries)
    }
}

impl From<NotificationSchedule> for Vec<ScheduledNotification> {
    fn from(schedule: NotificationSchedule) -> Self {
        schedule.0
    }
}
