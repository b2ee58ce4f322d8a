//! Cloud adapter and notifier traits

use async_trait::async_trait;
use reaper_api::{filters_match, ActionKind, Resource, ResourceKind, TagChanges, TagFilter};
use reaper_util::{Region, ResourceId};
use thiserror::Error;

/// Errors from cloud adapter operations
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("Listing {kind} in {region} failed: {message}")]
    ListFailed {
        region: Region,
        kind: ResourceKind,
        message: String,
    },

    #[error("Tagging {id} failed: {message}")]
    TagFailed { id: ResourceId, message: String },

    #[error("{action} on {id} failed: {message}")]
    ActionFailed {
        id: ResourceId,
        action: ActionKind,
        message: String,
    },

    #[error("Action {action} is not supported for {kind}")]
    UnsupportedAction { kind: ResourceKind, action: ActionKind },

    #[error("Resource not found: {0}")]
    NotFound(ResourceId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CloudResult<T> = Result<T, CloudError>;

/// Per-kind listing settings the adapter applies while enumerating
#[derive(Debug, Clone, Default)]
pub struct ResourceQuery {
    /// Tags that mark a resource as permanently excluded
    pub exception_tags: Vec<String>,
    /// Tags probed, in order, for the owner contact
    pub email_tags: Vec<String>,
    /// Include filters; empty means include everything
    pub filters: Vec<TagFilter>,
}

impl ResourceQuery {
    /// Filter a raw resource and derive its owner and exceptions.
    ///
    /// Returns `None` when the resource does not match the filters.
    pub fn apply(&self, resource: Resource) -> Option<Resource> {
        if !filters_match(&self.filters, &resource.tags) {
            return None;
        }
        Some(
            resource
                .with_owner_from(&self.email_tags)
                .with_exceptions_from(&self.exception_tags),
        )
    }
}

/// Cloud adapter trait - implemented by provider backends
#[async_trait]
pub trait CloudAdapter: Send + Sync {
    /// Regions the provider can enumerate
    async fn list_regions(&self) -> CloudResult<Vec<Region>>;

    /// Resources of one kind in one region, with owner and exceptions derived
    async fn list_resources(
        &self,
        region: &Region,
        kind: ResourceKind,
        query: &ResourceQuery,
    ) -> CloudResult<Vec<Resource>>;

    /// Apply tag changes; `new = None` removes the tag
    async fn update_tags(&self, resource: &Resource, changes: &TagChanges) -> CloudResult<()>;

    /// Perform a destructive action
    async fn do_action(&self, resource: &Resource, action: ActionKind) -> CloudResult<()>;
}

/// Errors from message delivery
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("No user found for {0}")]
    UnknownUser(String),
}

pub type NotifyResult<T> = Result<T, NotifyError>;

/// Message delivery
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post to the shared channel
    async fn send_channel(&self, text: &str) -> NotifyResult<()>;

    /// Message one owner directly
    async fn send_direct(&self, email: &str, text: &str) -> NotifyResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn resource(tags: &[(&str, &str)]) -> Resource {
        Resource::new(
            ResourceKind::Ec2,
            "i-1",
            Region::new("us-east-1"),
            "running",
            tags.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    #[test]
    fn query_derives_owner_and_exceptions() {
        let query = ResourceQuery {
            exception_tags: vec!["keep".into()],
            email_tags: vec!["owner".into(), "creator".into()],
            filters: vec![],
        };

        let r = query
            .apply(resource(&[("creator", "c@x.io"), ("keep", "forever")]))
            .unwrap();
        assert_eq!(r.email.as_deref(), Some("c@x.io"));
        assert!(r.is_excepted());
        assert_eq!(r.exceptions, vec![("keep".to_string(), "forever".to_string())]);
    }

    #[test]
    fn query_applies_filters() {
        let query = ResourceQuery {
            filters: vec![TagFilter {
                tag: "env".into(),
                values: vec!["dev".into(), "test".into()],
            }],
            ..Default::default()
        };

        assert!(query.apply(resource(&[("env", "dev")])).is_some());
        assert!(query.apply(resource(&[("env", "prod")])).is_none());
        assert!(query.apply(resource(&[])).is_none());
    }
}
