//! Message templates keyed by notice kind

use std::collections::HashMap;

use crate::{Notice, NoticeKind};

/// Templates for every notice kind; config may override any of them
#[derive(Debug, Clone)]
pub struct MessageTemplates {
    templates: HashMap<NoticeKind, String>,
}

impl MessageTemplates {
    /// Defaults with `overrides` applied on top
    pub fn with_overrides(overrides: HashMap<NoticeKind, String>) -> Self {
        let mut templates = Self::default();
        templates.templates.extend(overrides);
        templates
    }

    pub fn get(&self, kind: NoticeKind) -> &str {
        self.templates
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| default_template(kind))
    }

    /// Render the template for `notice.kind`.
    ///
    /// Placeholders are `{name}`; unknown names are left untouched and absent
    /// values render as `None`.
    pub fn render(&self, notice: &Notice) -> String {
        render_template(self.get(notice.kind), notice)
    }
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            templates: NoticeKind::ALL
                .iter()
                .map(|kind| (*kind, default_template(*kind).to_string()))
                .collect(),
        }
    }
}

fn placeholder(name: &str, notice: &Notice) -> Option<String> {
    let or_none = |v: &Option<String>| v.clone().unwrap_or_else(|| "None".to_string());
    Some(match name {
        "email" => or_none(&notice.email),
        "instance_type" => notice.resource_kind.to_string(),
        "instance_id" => notice.resource_id.to_string(),
        "instance_name" => notice
            .resource_name
            .clone()
            .unwrap_or_else(|| notice.resource_id.to_string()),
        "region" => notice.region.to_string(),
        "action" => notice.action.clone(),
        "tag" => notice.tag.clone(),
        "old_date" => or_none(&notice.old_date),
        "new_date" => or_none(&notice.new_date),
        "state" => notice.state.clone(),
        "n" => notice
            .rank
            .map(|r| (r + 1).to_string())
            .unwrap_or_else(|| "None".to_string()),
        _ => return None,
    })
}

fn render_template(template: &str, notice: &Notice) -> String {
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match placeholder(name, notice) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn default_template(kind: NoticeKind) -> &'static str {
    match kind {
        NoticeKind::AddActionDate => {
            "{instance_type} {instance_name} [{instance_id}] in {region} ({state}) is scheduled to {action} on {new_date}. Change tag {tag} to postpone."
        }
        NoticeKind::ResetActionDate => {
            "{instance_type} {instance_name} [{instance_id}] in {region} ({state}) had a {action} date of {old_date}, beyond the allowed maximum; it is now {new_date}."
        }
        NoticeKind::PastBumpNotification => {
            "Notification {n}: {instance_type} {instance_name} [{instance_id}] in {region} ({state}) was due to {action} on {old_date}; it will {action} on {new_date}. Change tag {tag} to postpone."
        }
        NoticeKind::CompleteAction => {
            "{instance_type} {instance_name} [{instance_id}] in {region} ({state}): {action} completed (scheduled for {old_date})."
        }
        NoticeKind::SendNotification => {
            "Notification {n}: {instance_type} {instance_name} [{instance_id}] in {region} ({state}) will {action} on {new_date}. Change tag {tag} to postpone."
        }
        NoticeKind::ResetNotifications => {
            "{instance_type} {instance_name} [{instance_id}] in {region} ({state}) now has a {action} date of {new_date}; notifications have been reset."
        }
        NoticeKind::LogNoNotification => {
            "{instance_type} {instance_name} [{instance_id}] in {region} ({state}) will {action} on {new_date}."
        }
        NoticeKind::TransitionAction => {
            "{instance_type} {instance_name} [{instance_id}] in {region} is now {state} and is scheduled to {action} on {new_date}. Change tag {tag} to postpone."
        }
        NoticeKind::SkipException => {
            "{instance_type} {instance_name} [{instance_id}] in {region} ({state}) skipped: exception tag {tag} is set to {new_date}."
        }
        NoticeKind::IgnoreOtherStates => {
            "{instance_type} {instance_name} [{instance_id}] in {region} is {state}, which is not handled."
        }
    }
}
