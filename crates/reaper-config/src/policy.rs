//! Validated policy structures

use crate::schema::{
    RawConfig, RawGlobalConfig, RawKindConfig, RawNotifierConfig, RawStateConfig,
};
use reaper_api::{
    ActionKind, MessageTemplates, NoticeKind, NotificationSchedule, ResourceKind, TagFilter,
};
use reaper_util::{default_data_dir, Region};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Validated policy ready for use by the sweeper
#[derive(Debug, Clone)]
pub struct Policy {
    pub global: GlobalConfig,
    pub notifier: NotifierConfig,
    pub messages: MessageTemplates,
    /// Kinds in a stable order (ec2, rds, autoscaling)
    pub kinds: Vec<KindPolicy>,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let overrides: HashMap<NoticeKind, String> = raw
            .messages
            .into_iter()
            .filter_map(|(key, template)| key.parse().ok().map(|kind| (kind, template)))
            .collect();

        let mut kinds: Vec<KindPolicy> = raw
            .kinds
            .into_iter()
            .filter_map(|(name, kind)| {
                name.parse::<ResourceKind>()
                    .ok()
                    .map(|parsed| KindPolicy::from_raw(parsed, kind))
            })
            .collect();
        kinds.sort_by_key(|k| k.kind);

        Self {
            global: GlobalConfig::from_raw(raw.global),
            notifier: raw
                .notifier
                .map(NotifierConfig::from_raw)
                .unwrap_or_default(),
            messages: MessageTemplates::with_overrides(overrides),
            kinds,
        }
    }

    /// Get the policy for a resource kind
    pub fn kind(&self, kind: ResourceKind) -> Option<&KindPolicy> {
        self.kinds.iter().find(|k| k.kind == kind)
    }

    pub fn enabled_kinds(&self) -> impl Iterator<Item = &KindPolicy> {
        self.kinds.iter().filter(|k| k.enabled)
    }
}

/// Run-wide settings
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    /// Empty means every region the provider reports
    pub regions: Vec<Region>,
    pub email_tags: Vec<String>,
    pub inventory_path: Option<PathBuf>,
    pub data_dir: PathBuf,
}

impl GlobalConfig {
    fn from_raw(raw: RawGlobalConfig) -> Self {
        Self {
            regions: raw.regions.into_iter().map(Region::new).collect(),
            email_tags: raw.email_tags,
            inventory_path: raw.inventory_path,
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
        }
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            email_tags: Vec::new(),
            inventory_path: None,
            data_dir: default_data_dir(),
        }
    }
}

/// Notifier settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NotifierConfig {
    #[default]
    Log,
    Slack {
        api_base: String,
        channel: String,
        token_env: String,
    },
}

impl NotifierConfig {
    fn from_raw(raw: RawNotifierConfig) -> Self {
        match raw {
            RawNotifierConfig::Log => Self::Log,
            RawNotifierConfig::Slack {
                api_base,
                channel,
                token_env,
            } => Self::Slack {
                api_base: api_base.trim_end_matches('/').to_string(),
                channel,
                token_env,
            },
        }
    }
}

/// Sweep settings for one resource kind
#[derive(Debug, Clone)]
pub struct KindPolicy {
    pub kind: ResourceKind,
    pub enabled: bool,
    pub exception_tags: Vec<String>,
    pub filters: Vec<TagFilter>,
    /// Lifecycle state name -> policy
    pub states: BTreeMap<String, StatePolicy>,
}

impl KindPolicy {
    fn from_raw(kind: ResourceKind, raw: RawKindConfig) -> Self {
        Self {
            kind,
            enabled: raw.enabled,
            exception_tags: raw.exceptions,
            filters: raw
                .filters
                .into_iter()
                .map(|f| TagFilter {
                    tag: f.tag,
                    values: f.values,
                })
                .collect(),
            states: raw
                .states
                .into_iter()
                .map(|(name, state)| {
                    let policy = StatePolicy::from_raw(name.clone(), state);
                    (name, policy)
                })
                .collect(),
        }
    }

    pub fn state(&self, name: &str) -> Option<&StatePolicy> {
        self.states.get(name)
    }

    /// Policy of the state entered after `state` completes
    pub fn next_state_of(&self, state: &StatePolicy) -> Option<&StatePolicy> {
        state.next_state.as_deref().and_then(|next| self.state(next))
    }
}

/// Lifecycle policy for one state
#[derive(Debug, Clone)]
pub struct StatePolicy {
    pub state: String,
    /// `None` for notify-only states
    pub action: Option<ActionKind>,
    pub action_tag: String,
    pub log_tag: String,
    pub default_days: u32,
    pub max_days: u32,
    pub schedule: NotificationSchedule,
    pub next_state: Option<String>,
}

impl StatePolicy {
    fn from_raw(state: String, raw: RawStateConfig) -> Self {
        Self {
            state,
            action: raw.action.and_then(|a| a.parse().ok()),
            action_tag: raw.action_tag,
            log_tag: raw.log_tag,
            default_days: raw.default_days,
            max_days: raw.max_days,
            schedule: NotificationSchedule::from_pairs(raw.notifications),
            next_state: raw.next_state,
        }
    }

    /// Action name used in messages and completion logs
    pub fn action_label(&self) -> &'static str {
        self.action.map(|a| a.as_str()).unwrap_or("notify")
    }
}
