//! Inventory-file cloud adapter
//!
//! The inventory is a JSON document listing resources per region:
//!
//! ```json
//! { "regions": { "us-east-1": [
//!     { "kind": "ec2", "id": "i-1", "name": "web", "state": "running",
//!       "tags": { "owner_email": "a@example.com" } } ] } }
//! ```
//!
//! Tag writes and actions rewrite the file atomically (temp file + rename),
//! so consecutive runs against the same file behave like runs against a
//! real account.

use async_trait::async_trait;
use reaper_api::{ActionKind, Resource, ResourceKind, TagChanges};
use reaper_cloud_api::{CloudAdapter, CloudError, CloudResult, ResourceQuery};
use reaper_util::Region;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// On-disk inventory document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub regions: BTreeMap<Region, Vec<InventoryEntry>>,
}

/// One resource in the inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub kind: ResourceKind,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub state: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl InventoryEntry {
    fn to_resource(&self, region: &Region) -> Resource {
        Resource::new(
            self.kind,
            self.id.as_str(),
            region.clone(),
            self.state.as_str(),
            self.tags.clone(),
        )
        .with_name(self.name.clone())
    }
}

/// Cloud adapter backed by an inventory file
pub struct InventoryCloud {
    path: PathBuf,
    inventory: Mutex<Inventory>,
}

impl InventoryCloud {
    /// Load the inventory at `path`
    pub async fn open(path: impl AsRef<Path>) -> CloudResult<Self> {
        let path = path.as_ref().to_path_buf();
        let content = tokio::fs::read_to_string(&path).await?;
        let inventory: Inventory = serde_json::from_str(&content).map_err(|e| {
            CloudError::Internal(format!("Invalid inventory {}: {}", path.display(), e))
        })?;

        info!(
            path = %path.display(),
            regions = inventory.regions.len(),
            resources = inventory.regions.values().map(Vec::len).sum::<usize>(),
            "Inventory loaded"
        );

        Ok(Self {
            path,
            inventory: Mutex::new(inventory),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the in-memory document
    pub async fn snapshot(&self) -> Inventory {
        self.inventory.lock().await.clone()
    }

    async fn persist(&self, inventory: &Inventory) -> CloudResult<()> {
        let json = serde_json::to_string_pretty(inventory)
            .map_err(|e| CloudError::Internal(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "Inventory written");
        Ok(())
    }

    /// Mutate one entry and persist the document. Memory only changes once
    /// the write succeeded.
    async fn update_entry(
        &self,
        resource: &Resource,
        f: impl FnOnce(&mut InventoryEntry),
    ) -> CloudResult<()> {
        let mut inventory = self.inventory.lock().await;
        let mut updated = inventory.clone();
        let entry = updated
            .regions
            .get_mut(&resource.region)
            .and_then(|entries| {
                entries
                    .iter_mut()
                    .find(|e| e.kind == resource.kind && e.id == resource.id.as_str())
            })
            .ok_or_else(|| CloudError::NotFound(resource.id.clone()))?;
        f(entry);
        self.persist(&updated).await?;
        *inventory = updated;
        Ok(())
    }
}

#[async_trait]
impl CloudAdapter for InventoryCloud {
    async fn list_regions(&self) -> CloudResult<Vec<Region>> {
        Ok(self.inventory.lock().await.regions.keys().cloned().collect())
    }

    async fn list_resources(
        &self,
        region: &Region,
        kind: ResourceKind,
        query: &ResourceQuery,
    ) -> CloudResult<Vec<Resource>> {
        let inventory = self.inventory.lock().await;
        Ok(inventory
            .regions
            .get(region)
            .into_iter()
            .flatten()
            .filter(|e| e.kind == kind)
            .filter_map(|e| query.apply(e.to_resource(region)))
            .collect())
    }

    async fn update_tags(&self, resource: &Resource, changes: &TagChanges) -> CloudResult<()> {
        self.update_entry(resource, |entry| changes.apply_to(&mut entry.tags))
            .await?;
        debug!(resource_id = %resource.id, count = changes.len(), "Tags updated");
        Ok(())
    }

    async fn do_action(&self, resource: &Resource, action: ActionKind) -> CloudResult<()> {
        if !resource.kind.supports(action) {
            return Err(CloudError::UnsupportedAction {
                kind: resource.kind,
                action,
            });
        }

        self.update_entry(resource, |entry| {
            entry.state = action.resulting_state().to_string();
        })
        .await?;
        info!(resource_id = %resource.id, action = %action, "Inventory resource updated");
        Ok(())
    }
}
