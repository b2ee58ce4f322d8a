//! Classifications and notices
//!
//! A [`Classification`] is what the decision engine concludes for one
//! resource. A [`Notice`] is the message-worthy record built from it (or from
//! the checks that run before the engine) and handed to logs, the audit
//! store and the notifier.

use reaper_util::{Region, ResourceId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{ParseNameError, Resource, ResourceKind};

/// Outcome of one decision engine evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// No action date was set; one was added
    AddActionDate,
    /// Action date was beyond the policy maximum; pulled back
    ResetActionDate,
    /// Action date passed before all notifications went out; deferred
    PastBumpNotification,
    /// Action date reached with every notification sent; act now
    CompleteAction,
    /// A notification's lead window opened
    SendNotification,
    /// Action date was pushed out after notifications were sent
    ResetNotifications,
    /// Nothing to do this run
    LogNoNotification,
}

impl Classification {
    pub const ALL: [Classification; 7] = [
        Self::AddActionDate,
        Self::ResetActionDate,
        Self::PastBumpNotification,
        Self::CompleteAction,
        Self::SendNotification,
        Self::ResetNotifications,
        Self::LogNoNotification,
    ];

    pub fn as_str(&self) -> &'static str {
        NoticeKind::from(*self).as_str()
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every kind of notice a run can emit; also the message template key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoticeKind {
    AddActionDate,
    ResetActionDate,
    PastBumpNotification,
    CompleteAction,
    SendNotification,
    ResetNotifications,
    LogNoNotification,
    /// Resource moved into the next lifecycle state after an action
    TransitionAction,
    /// Resource carries an exception tag
    SkipException,
    /// Resource is in a state with no configured policy
    IgnoreOtherStates,
}

impl NoticeKind {
    pub const ALL: [NoticeKind; 10] = [
        Self::AddActionDate,
        Self::ResetActionDate,
        Self::PastBumpNotification,
        Self::CompleteAction,
        Self::SendNotification,
        Self::ResetNotifications,
        Self::LogNoNotification,
        Self::TransitionAction,
        Self::SkipException,
        Self::IgnoreOtherStates,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddActionDate => "ADD_ACTION_DATE",
            Self::ResetActionDate => "RESET_ACTION_DATE",
            Self::PastBumpNotification => "PAST_BUMP_NOTIFICATION",
            Self::CompleteAction => "COMPLETE_ACTION",
            Self::SendNotification => "SEND_NOTIFICATION",
            Self::ResetNotifications => "RESET_NOTIFICATIONS",
            Self::LogNoNotification => "LOG_NO_NOTIFICATION",
            Self::TransitionAction => "TRANSITION_ACTION",
            Self::SkipException => "SKIP_EXCEPTION",
            Self::IgnoreOtherStates => "IGNORE_OTHER_STATES",
        }
    }

    /// Whether the resource owner gets a direct message for this notice
    pub fn directs_owner(&self) -> bool {
        !matches!(
            self,
            Self::LogNoNotification | Self::SkipException | Self::IgnoreOtherStates
        )
    }
}

impl From<Classification> for NoticeKind {
    fn from(c: Classification) -> Self {
        match c {
            Classification::AddActionDate => Self::AddActionDate,
            Classification::ResetActionDate => Self::ResetActionDate,
            Classification::PastBumpNotification => Self::PastBumpNotification,
            Classification::CompleteAction => Self::CompleteAction,
            Classification::SendNotification => Self::SendNotification,
            Classification::ResetNotifications => Self::ResetNotifications,
            Classification::LogNoNotification => Self::LogNoNotification,
        }
    }
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoticeKind {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseNameError::UnknownNoticeKind(s.to_string()))
    }
}

/// One message-worthy outcome for one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub resource_kind: ResourceKind,
    pub resource_id: ResourceId,
    pub resource_name: Option<String>,
    pub region: Region,
    pub state: String,
    pub email: Option<String>,
    pub action: String,
    pub tag: String,
    pub old_date: Option<String>,
    pub new_date: Option<String>,
    /// Zero-based notification rank, for bump/send notices
    pub rank: Option<usize>,
    /// Rendered message text
    pub message: String,
}

impl Notice {
    pub fn for_resource(kind: NoticeKind, resource: &Resource) -> Self {
        Self {
            kind,
            resource_kind: resource.kind,
            resource_id: resource.id.clone(),
            resource_name: resource.name.clone(),
            region: resource.region.clone(),
            state: resource.state.clone(),
            email: resource.email.clone(),
            action: String::new(),
            tag: String::new(),
            old_date: None,
            new_date: None,
            rank: None,
            message: String::new(),
        }
    }

    /// Line broadcast to the shared channel
    pub fn channel_line(&self, dry_run: bool) -> String {
        format!(
            "{}{} [{}]: {}",
            if dry_run { "[DRY RUN] " } else { "" },
            self.email.as_deref().unwrap_or("None"),
            self.kind,
            self.message,
        )
    }

    pub fn directs_owner(&self) -> bool {
        self.email.is_some() && self.kind.directs_owner()
    }
}
