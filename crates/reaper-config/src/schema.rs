//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Run-wide settings
    #[serde(default)]
    pub global: RawGlobalConfig,

    /// Where notices are delivered (default: log only)
    #[serde(default)]
    pub notifier: Option<RawNotifierConfig>,

    /// Message template overrides, keyed by notice kind (e.g. `SEND_NOTIFICATION`)
    #[serde(default)]
    pub messages: HashMap<String, String>,

    /// Per resource kind (`ec2`, `rds`, `autoscaling`) settings
    #[serde(default)]
    pub kinds: BTreeMap<String, RawKindConfig>,
}

/// Run-wide settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawGlobalConfig {
    /// Regions to scan. Empty means every region the provider reports.
    #[serde(default)]
    pub regions: Vec<String>,

    /// Tags probed, in order, for the owner's contact address
    #[serde(default)]
    pub email_tags: Vec<String>,

    /// Inventory file used by the file-backed cloud adapter
    pub inventory_path: Option<PathBuf>,

    /// Directory for the audit database
    pub data_dir: Option<PathBuf>,
}

/// Notifier settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawNotifierConfig {
    /// Notices only go to the log
    Log,
    /// Slack-compatible Web API
    Slack {
        /// Base URL of the Web API
        #[serde(default = "default_slack_api_base")]
        api_base: String,
        /// Channel that receives every notice
        channel: String,
        /// Environment variable holding the bot token
        #[serde(default = "default_token_env")]
        token_env: String,
    },
}

fn default_slack_api_base() -> String {
    "https://slack.com/api".to_string()
}

fn default_token_env() -> String {
    "REAPER_SLACK_TOKEN".to_string()
}

/// Settings for one resource kind
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawKindConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Tags that, when set on a resource, exclude it permanently
    #[serde(default)]
    pub exceptions: Vec<String>,

    /// Only resources matching one of these filters are swept
    #[serde(default)]
    pub filters: Vec<RawTagFilter>,

    /// Lifecycle state name -> policy
    #[serde(default)]
    pub states: BTreeMap<String, RawStateConfig>,
}

fn default_enabled() -> bool {
    true
}

/// Tag filter
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawTagFilter {
    pub tag: String,
    pub values: Vec<String>,
}

/// Policy for one lifecycle state
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawStateConfig {
    /// `stop`, `terminate` or `delete`; omitted means notify-only
    pub action: Option<String>,

    /// Tag holding the action date
    pub action_tag: String,

    /// Tag receiving the completion log
    pub log_tag: String,

    /// Days until the action when no date is set
    pub default_days: u32,

    /// Furthest out an action date may be
    pub max_days: u32,

    /// Notification tag -> lead time in days
    #[serde(default)]
    pub notifications: BTreeMap<String, u32>,

    /// State entered once the action completes
    pub next_state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_kind_with_states() {
        let toml_str = r#"
            config_version = 1

            [kinds.ec2]
            exceptions = ["reaper/exception"]

            [kinds.ec2.states.running]
            action = "stop"
            action_tag = "reaper/stop/date"
            log_tag = "reaper/stop/log"
            default_days = 31
            max_days = 62
            next_state = "stopped"

            [kinds.ec2.states.running.notifications]
            "reaper/stop/notification/1" = 15
            "reaper/stop/notification/2" = 7
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        let ec2 = &config.kinds["ec2"];
        assert!(ec2.enabled);
        let running = &ec2.states["running"];
        assert_eq!(running.action.as_deref(), Some("stop"));
        assert_eq!(running.notifications.len(), 2);
        assert_eq!(running.next_state.as_deref(), Some("stopped"));
    }

    #[test]
    fn parse_notifier() {
        let toml_str = r##"
            config_version = 1

            [notifier]
            type = "slack"
            channel = "#cloud-cleanup"
        "##;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        match config.notifier {
            Some(RawNotifierConfig::Slack {
                api_base,
                channel,
                token_env,
            }) => {
                assert_eq!(api_base, "https://slack.com/api");
                assert_eq!(channel, "#cloud-cleanup");
                assert_eq!(token_env, "REAPER_SLACK_TOKEN");
            }
            other => panic!("unexpected notifier: {:?}", other),
        }
    }
}
