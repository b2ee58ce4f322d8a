//! Configuration validation

use crate::schema::{RawConfig, RawKindConfig, RawNotifierConfig, RawStateConfig};
use reaper_api::{ActionKind, NoticeKind, ResourceKind};
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Unknown resource kind: {0}")]
    UnknownKind(String),

    #[error("{kind} state '{state}': {message}")]
    StateError {
        kind: String,
        state: String,
        message: String,
    },

    #[error("{kind} state '{state}': action '{action}' is not supported for {kind}")]
    UnsupportedAction {
        kind: String,
        state: String,
        action: String,
    },

    #[error("{kind} state '{state}': default_days {default_days} > max_days {max_days}")]
    DefaultExceedsMax {
        kind: String,
        state: String,
        default_days: u32,
        max_days: u32,
    },

    #[error("{kind} state '{state}': next_state '{next_state}' is not a configured state")]
    UnknownNextState {
        kind: String,
        state: String,
        next_state: String,
    },

    #[error("{kind}: tag '{tag}' is used more than once")]
    DuplicateTag { kind: String, tag: String },

    #[error("Unknown message template key: {0}")]
    UnknownMessageKey(String),

    #[error("Notifier config error: {0}")]
    NotifierError(String),

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.global.regions.iter().any(|r| r.trim().is_empty()) {
        errors.push(ValidationError::GlobalError(
            "regions cannot contain empty names".into(),
        ));
    }
    if config.global.email_tags.iter().any(|t| t.trim().is_empty()) {
        errors.push(ValidationError::GlobalError(
            "email_tags cannot contain empty tag names".into(),
        ));
    }

    if let Some(RawNotifierConfig::Slack {
        api_base,
        channel,
        token_env,
    }) = &config.notifier
    {
        if api_base.trim().is_empty() {
            errors.push(ValidationError::NotifierError("api_base cannot be empty".into()));
        }
        if channel.trim().is_empty() {
            errors.push(ValidationError::NotifierError("channel cannot be empty".into()));
        }
        if token_env.trim().is_empty() {
            errors.push(ValidationError::NotifierError("token_env cannot be empty".into()));
        }
    }

    for key in config.messages.keys() {
        if key.parse::<NoticeKind>().is_err() {
            errors.push(ValidationError::UnknownMessageKey(key.clone()));
        }
    }

    for (name, kind_config) in &config.kinds {
        match name.parse::<ResourceKind>() {
            Ok(kind) => errors.extend(validate_kind(kind, kind_config)),
            Err(_) => errors.push(ValidationError::UnknownKind(name.clone())),
        }
    }

    errors
}

fn validate_kind(kind: ResourceKind, config: &RawKindConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    // Every date/log tag must belong to exactly one role across all states
    let mut seen_tags = HashSet::new();
    for state in config.states.values() {
        let tags = [&state.action_tag, &state.log_tag]
            .into_iter()
            .chain(state.notifications.keys());
        for tag in tags {
            if !tag.is_empty() && !seen_tags.insert(tag.as_str()) {
                errors.push(ValidationError::DuplicateTag {
                    kind: kind.to_string(),
                    tag: tag.clone(),
                });
            }
        }
    }

    if config.exceptions.iter().any(|t| t.trim().is_empty()) {
        errors.push(ValidationError::GlobalError(format!(
            "{}: exception tags cannot be empty",
            kind
        )));
    }

    for filter in &config.filters {
        if filter.tag.trim().is_empty() || filter.values.is_empty() {
            errors.push(ValidationError::GlobalError(format!(
                "{}: filters need a tag and at least one value",
                kind
            )));
        }
    }

    for (name, state) in &config.states {
        errors.extend(validate_state(kind, name, state, config));
    }

    errors
}

fn validate_state(
    kind: ResourceKind,
    name: &str,
    state: &RawStateConfig,
    config: &RawKindConfig,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let state_error = |message: &str| ValidationError::StateError {
        kind: kind.to_string(),
        state: name.to_string(),
        message: message.to_string(),
    };

    if let Some(action) = &state.action {
        match action.parse::<ActionKind>() {
            Ok(parsed) if kind.supports(parsed) => {}
            _ => errors.push(ValidationError::UnsupportedAction {
                kind: kind.to_string(),
                state: name.to_string(),
                action: action.clone(),
            }),
        }
    }

    if state.action_tag.trim().is_empty() {
        errors.push(state_error("action_tag cannot be empty"));
    }
    if state.log_tag.trim().is_empty() {
        errors.push(state_error("log_tag cannot be empty"));
    }
    if state.action_tag == state.log_tag {
        errors.push(state_error("action_tag and log_tag must differ"));
    }
    if state.notifications.keys().any(|t| t.trim().is_empty()) {
        errors.push(state_error("notification tags cannot be empty"));
    }

    if state.default_days > state.max_days {
        errors.push(ValidationError::DefaultExceedsMax {
            kind: kind.to_string(),
            state: name.to_string(),
            default_days: state.default_days,
            max_days: state.max_days,
        });
    }

    if let Some(next) = &state.next_state {
        if next == name {
            errors.push(state_error("next_state cannot be the state itself"));
        } else if !config.states.contains_key(next) {
            errors.push(ValidationError::UnknownNextState {
                kind: kind.to_string(),
                state: name.to_string(),
                next_state: next.clone(),
            });
        }
    }

    errors
}
