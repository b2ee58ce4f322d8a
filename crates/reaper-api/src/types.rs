//! Shared types for the tag-reaper domain

use chrono::NaiveDate;
use reaper_util::{date_from_tags, format_iso_date, Region, ResourceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error for unknown kind/action names
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseNameError {
    #[error("Unknown resource kind: {0}")]
    UnknownKind(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Unknown notice kind: {0}")]
    UnknownNoticeKind(String),
}

/// Kind of cloud resource swept by tag-reaper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Compute instance
    Ec2,
    /// Database instance
    Rds,
    /// Auto scaling group
    Autoscaling,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [Self::Ec2, Self::Rds, Self::Autoscaling];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ec2 => "ec2",
            Self::Rds => "rds",
            Self::Autoscaling => "autoscaling",
        }
    }

    /// Destructive actions the provider can perform on this kind
    pub fn supported_actions(&self) -> &'static [ActionKind] {
        match self {
            Self::Ec2 => &[ActionKind::Stop, ActionKind::Terminate],
            Self::Rds => &[ActionKind::Stop, ActionKind::Delete],
            Self::Autoscaling => &[],
        }
    }

    pub fn supports(&self, action: ActionKind) -> bool {
        self.supported_actions().contains(&action)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ec2" => Ok(Self::Ec2),
            "rds" => Ok(Self::Rds),
            "autoscaling" | "asg" => Ok(Self::Autoscaling),
            other => Err(ParseNameError::UnknownKind(other.to_string())),
        }
    }
}

/// Destructive action performed when a lifecycle state completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Stop,
    Terminate,
    Delete,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Terminate => "terminate",
            Self::Delete => "delete",
        }
    }

    /// Lifecycle state a resource is left in after this action
    pub fn resulting_state(&self) -> &'static str {
        match self {
            Self::Stop => "stopped",
            Self::Terminate => "terminated",
            Self::Delete => "deleted",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stop" => Ok(Self::Stop),
            "terminate" => Ok(Self::Terminate),
            "delete" => Ok(Self::Delete),
            other => Err(ParseNameError::UnknownAction(other.to_string())),
        }
    }
}

/// A cloud resource as seen by one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    pub id: ResourceId,
    pub name: Option<String>,
    pub region: Region,
    /// Provider lifecycle state (e.g. `running`, `stopped`)
    pub state: String,
    pub tags: BTreeMap<String, String>,
    /// Owner contact, derived from tags
    pub email: Option<String>,
    /// `(tag, value)` pairs of exception tags present on the resource
    pub exceptions: Vec<(String, String)>,
}

impl Resource {
    pub fn new(
        kind: ResourceKind,
        id: impl Into<ResourceId>,
        region: Region,
        state: impl Into<String>,
        tags: BTreeMap<String, String>,
    ) -> Self {
        Self {
            kind,
            id: id.into(),
            name: None,
            region,
            state: state.into(),
            tags,
            email: None,
            exceptions: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Owner is the first non-empty value among `email_tags`, in priority order.
    pub fn with_owner_from(mut self, email_tags: &[String]) -> Self {
        self.email = email_tags
            .iter()
            .filter_map(|tag| self.tags.get(tag))
            .find(|value| !value.trim().is_empty())
            .cloned();
        self
    }

    /// Collect every exception tag that is present with a non-empty value.
    pub fn with_exceptions_from(mut self, exception_tags: &[String]) -> Self {
        self.exceptions = exception_tags
            .iter()
            .filter_map(|tag| {
                self.tags
                    .get(tag)
                    .filter(|value| !value.is_empty())
                    .map(|value| (tag.clone(), value.clone()))
            })
            .collect();
        self
    }

    pub fn is_excepted(&self) -> bool {
        !self.exceptions.is_empty()
    }

    pub fn tag(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).map(String::as_str)
    }

    pub fn tag_date(&self, tag: &str) -> Option<NaiveDate> {
        date_from_tags(&self.tags, tag)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }
}

/// Include resources whose `tag` holds one of `values`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    pub tag: String,
    pub values: Vec<String>,
}

impl TagFilter {
    pub fn matches(&self, tags: &BTreeMap<String, String>) -> bool {
        tags.get(&self.tag)
            .is_some_and(|value| self.values.iter().any(|v| v == value))
    }
}

/// No filters means everything matches; otherwise any filter may match.
pub fn filters_match(filters: &[TagFilter], tags: &BTreeMap<String, String>) -> bool {
    filters.is_empty() || filters.iter().any(|f| f.matches(tags))
}

/// Old and new value of one tag. `None` means the tag is absent / removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagChange {
    pub old: Option<String>,
    pub new: Option<String>,
}

impl TagChange {
    pub fn is_change(&self) -> bool {
        self.old != self.new
    }
}

/// Tag writes computed for one resource, keyed by tag name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagChanges(BTreeMap<String, TagChange>);

impl TagChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `tag` to `new`, taking the old value from the resource.
    pub fn set(&mut self, resource: &Resource, tag: &str, new: Option<String>) {
        self.0.insert(
            tag.to_string(),
            TagChange {
                old: resource.tags.get(tag).cloned(),
                new,
            },
        );
    }

    pub fn set_date(&mut self, resource: &Resource, tag: &str, new: Option<NaiveDate>) {
        self.set(resource, tag, new.map(format_iso_date));
    }

    pub fn clear(&mut self, resource: &Resource, tag: &str) {
        self.set(resource, tag, None);
    }

    pub fn get(&self, tag: &str) -> Option<&TagChange> {
        self.0.get(tag)
    }

    /// Only the entries whose value actually changes
    pub fn changed(&self) -> TagChanges {
        TagChanges(
            self.0
                .iter()
                .filter(|(_, change)| change.is_change())
                .map(|(tag, change)| (tag.clone(), change.clone()))
                .collect(),
        )
    }

    /// Write the new values into `tags`, removing tags whose new value is absent
    pub fn apply_to(&self, tags: &mut BTreeMap<String, String>) {
        for (tag, change) in &self.0 {
            match &change.new {
                Some(value) => {
                    tags.insert(tag.clone(), value.clone());
                }
                None => {
                    tags.remove(tag);
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TagChange)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn resource(pairs: &[(&str, &str)]) -> Resource {
        Resource::new(
            ResourceKind::Ec2,
            "i-0abc",
            Region::new("us-east-1"),
            "running",
            tags(pairs),
        )
    }

    #[test]
    fn owner_is_first_non_empty_email_tag() {
        let email_tags = vec!["owner_email".to_string(), "divvy_owner".to_string()];

        let r = resource(&[("owner_email", " "), ("divvy_owner", "b@example.com")])
            .with_owner_from(&email_tags);
        assert_eq!(r.email.as_deref(), Some("b@example.com"));

        let r = resource(&[("owner_email", "a@example.com"), ("divvy_owner", "b@example.com")])
            .with_owner_from(&email_tags);
        assert_eq!(r.email.as_deref(), Some("a@example.com"));

        let r = resource(&[]).with_owner_from(&email_tags);
        assert!(r.email.is_none());
    }

    #[test]
    fn exceptions_require_non_empty_value() {
        let exception_tags = vec!["reaper/exception".to_string(), "keep".to_string()];

        let r = resource(&[("reaper/exception", ""), ("keep", "forever")])
            .with_exceptions_from(&exception_tags);
        assert!(r.is_excepted());
        assert_eq!(r.exceptions, vec![("keep".to_string(), "forever".to_string())]);

        let r = resource(&[("reaper/exception", "")]).with_exceptions_from(&exception_tags);
        assert!(!r.is_excepted());
    }

    #[test]
    fn filters_match_any() {
        let filters = vec![
            TagFilter {
                tag: "env".into(),
                values: vec!["test".into(), "dev".into()],
            },
            TagFilter {
                tag: "team".into(),
                values: vec!["sandbox".into()],
            },
        ];

        assert!(filters_match(&filters, &tags(&[("env", "dev")])));
        assert!(filters_match(&filters, &tags(&[("team", "sandbox")])));
        assert!(!filters_match(&filters, &tags(&[("env", "prod")])));
        assert!(filters_match(&[], &tags(&[])));
    }

    #[test]
    fn tag_changes_filter_unchanged() {
        let r = resource(&[("a", "2024-01-01"), ("b", "2024-01-02")]);
        let mut changes = TagChanges::new();
        changes.set(&r, "a", Some("2024-01-01".into()));
        changes.clear(&r, "b");
        changes.set(&r, "c", Some("x".into()));
        changes.clear(&r, "d");

        let changed = changes.changed();
        assert_eq!(changed.len(), 2);
        assert!(changed.get("a").is_none());
        assert_eq!(changed.get("b").unwrap().new, None);
        assert_eq!(changed.get("c").unwrap().old, None);
        assert!(changed.get("d").is_none());

        let mut written = r.tags.clone();
        changed.apply_to(&mut written);
        assert_eq!(written, tags(&[("a", "2024-01-01"), ("c", "x")]));
    }

    #[test]
    fn kind_actions() {
        assert!(ResourceKind::Ec2.supports(ActionKind::Terminate));
        assert!(!ResourceKind::Ec2.supports(ActionKind::Delete));
        assert!(ResourceKind::Rds.supports(ActionKind::Delete));
        assert!(ResourceKind::Autoscaling.supported_actions().is_empty());

        assert_eq!("ASG".parse::<ResourceKind>().unwrap(), ResourceKind::Autoscaling);
        assert!("lambda".parse::<ResourceKind>().is_err());
        assert_eq!("Stop".parse::<ActionKind>().unwrap(), ActionKind::Stop);
    }
}
