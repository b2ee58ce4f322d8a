//! Mock cloud adapter and notifier for testing

use async_trait::async_trait;
use reaper_api::{ActionKind, Resource, ResourceKind, TagChanges};
use reaper_util::{Region, ResourceId};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::{
    CloudAdapter, CloudError, CloudResult, Notifier, NotifyError, NotifyResult, ResourceQuery,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory cloud for unit/integration testing.
///
/// Tag writes and actions mutate the stored resources, so consecutive runs
/// see each other's effects.
#[derive(Default)]
pub struct MockCloud {
    resources: Arc<Mutex<BTreeMap<Region, Vec<Resource>>>>,
    tag_updates: Arc<Mutex<Vec<(ResourceId, TagChanges)>>>,
    actions: Arc<Mutex<Vec<(ResourceId, ActionKind)>>>,

    /// Configure listing to fail
    pub fail_list: Arc<Mutex<bool>>,

    /// Resources whose actions fail
    pub fail_action_for: Arc<Mutex<HashSet<ResourceId>>>,

    /// Resources whose tag writes fail
    pub fail_tags_for: Arc<Mutex<HashSet<ResourceId>>>,
}

impl MockCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(self, resource: Resource) -> Self {
        self.add_resource(resource);
        self
    }

    pub fn add_resource(&self, resource: Resource) {
        lock(&self.resources)
            .entry(resource.region.clone())
            .or_default()
            .push(resource);
    }

    /// Current stored copy of a resource
    pub fn resource(&self, id: &str) -> Option<Resource> {
        lock(&self.resources)
            .values()
            .flatten()
            .find(|r| r.id.as_str() == id)
            .cloned()
    }

    /// Every `update_tags` call so far
    pub fn tag_updates(&self) -> Vec<(ResourceId, TagChanges)> {
        lock(&self.tag_updates).clone()
    }

    /// Every successful `do_action` call so far
    pub fn actions(&self) -> Vec<(ResourceId, ActionKind)> {
        lock(&self.actions).clone()
    }

    fn with_stored<T>(
        &self,
        resource: &Resource,
        f: impl FnOnce(&mut Resource) -> T,
    ) -> CloudResult<T> {
        let mut resources = lock(&self.resources);
        resources
            .get_mut(&resource.region)
            .and_then(|list| list.iter_mut().find(|r| r.id == resource.id))
            .map(f)
            .ok_or_else(|| CloudError::NotFound(resource.id.clone()))
    }
}

#[async_trait]
impl CloudAdapter for MockCloud {
    async fn list_regions(&self) -> CloudResult<Vec<Region>> {
        Ok(lock(&self.resources).keys().cloned().collect())
    }

    async fn list_resources(
        &self,
        region: &Region,
        kind: ResourceKind,
        query: &ResourceQuery,
    ) -> CloudResult<Vec<Resource>> {
        if *lock(&self.fail_list) {
            return Err(CloudError::ListFailed {
                region: region.clone(),
                kind,
                message: "Mock list failure".into(),
            });
        }

        let resources = lock(&self.resources);
        Ok(resources
            .get(region)
            .into_iter()
            .flatten()
            .filter(|r| r.kind == kind)
            .filter_map(|r| query.apply(r.clone()))
            .collect())
    }

    async fn update_tags(&self, resource: &Resource, changes: &TagChanges) -> CloudResult<()> {
        if lock(&self.fail_tags_for).contains(&resource.id) {
            return Err(CloudError::TagFailed {
                id: resource.id.clone(),
                message: "Mock tag failure".into(),
            });
        }

        self.with_stored(resource, |stored| changes.apply_to(&mut stored.tags))?;
        lock(&self.tag_updates).push((resource.id.clone(), changes.clone()));
        debug!(resource_id = %resource.id, count = changes.len(), "Mock tags updated");
        Ok(())
    }

    async fn do_action(&self, resource: &Resource, action: ActionKind) -> CloudResult<()> {
        if !resource.kind.supports(action) {
            return Err(CloudError::UnsupportedAction {
                kind: resource.kind,
                action,
            });
        }
        if lock(&self.fail_action_for).contains(&resource.id) {
            return Err(CloudError::ActionFailed {
                id: resource.id.clone(),
                action,
                message: "Mock action failure".into(),
            });
        }

        self.with_stored(resource, |stored| {
            stored.state = action.resulting_state().to_string();
        })?;
        lock(&self.actions).push((resource.id.clone(), action));
        Ok(())
    }
}

/// Notifier that records every message
#[derive(Default)]
pub struct MockNotifier {
    channel: Arc<Mutex<Vec<String>>>,
    direct: Arc<Mutex<Vec<(String, String)>>>,

    /// Configure delivery to fail
    pub fail: Arc<Mutex<bool>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel_messages(&self) -> Vec<String> {
        lock(&self.channel).clone()
    }

    /// `(email, text)` pairs
    pub fn direct_messages(&self) -> Vec<(String, String)> {
        lock(&self.direct).clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_channel(&self, text: &str) -> NotifyResult<()> {
        if *lock(&self.fail) {
            return Err(NotifyError::Api("Mock delivery failure".into()));
        }
        lock(&self.channel).push(text.to_string());
        Ok(())
    }

    async fn send_direct(&self, email: &str, text: &str) -> NotifyResult<()> {
        if *lock(&self.fail) {
            return Err(NotifyError::Api("Mock delivery failure".into()));
        }
        lock(&self.direct).push((email.to_string(), text.to_string()));
        Ok(())
    }
}
