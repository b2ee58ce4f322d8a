//! Audit event types

use chrono::{DateTime, Local, NaiveDate};
use reaper_api::{ActionKind, Notice, ResourceKind};
use reaper_util::{Region, ResourceId, RunId};
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Sweep started
    RunStarted {
        run_id: RunId,
        run_date: NaiveDate,
        dry_run: bool,
    },

    /// Notice emitted for one resource
    ResourceNotice { run_id: RunId, notice: Notice },

    /// Destructive action performed
    ActionExecuted {
        run_id: RunId,
        resource_kind: ResourceKind,
        resource_id: ResourceId,
        region: Region,
        action: ActionKind,
    },

    /// A provider call failed; `resource_id` is absent when listing failed
    ResourceFailed {
        run_id: RunId,
        resource_kind: ResourceKind,
        resource_id: Option<ResourceId>,
        region: Region,
        error: String,
    },

    /// Sweep finished (or was interrupted)
    RunFinished {
        run_id: RunId,
        notices: usize,
        actions: usize,
        failures: usize,
        interrupted: bool,
    },
}

impl AuditEventType {
    pub fn run_id(&self) -> &RunId {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::ResourceNotice { run_id, .. }
            | Self::ActionExecuted { run_id, .. }
            | Self::ResourceFailed { run_id, .. }
            | Self::RunFinished { run_id, .. } => run_id,
        }
    }
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Wall-clock time the event was recorded (not the run date)
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: Local::now(),
            event,
        }
    }
}
