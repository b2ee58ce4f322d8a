//! Per-resource planning
//!
//! Turns one resource plus its kind's policy into everything a run would do
//! to it: the engine's classification, the tag writes, the action to execute
//! and the notices to emit. Planning is pure; [`crate::Sweeper`] applies the
//! plan.

use chrono::NaiveDate;
use reaper_api::{
    ActionKind, Classification, MessageTemplates, Notice, NoticeKind, Resource, TagChanges,
};
use reaper_config::{KindPolicy, StatePolicy};
use reaper_util::{add_days, format_iso_date, format_optional_date};

use crate::{decide, NotificationRecord};

/// What one run does to one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePlan {
    /// Engine result; `None` for skipped and unhandled resources
    pub classification: Option<Classification>,
    /// Action to execute before any tag write
    pub action: Option<ActionKind>,
    /// Every computed tag value, including unchanged ones
    pub tag_changes: TagChanges,
    /// Main notice first, then the transition notice if any
    pub notices: Vec<Notice>,
}

impl ResourcePlan {
    fn notice_only(notice: Notice) -> Self {
        Self {
            classification: None,
            action: None,
            tag_changes: TagChanges::new(),
            notices: vec![notice],
        }
    }
}

/// Plan the run for `resource` under `policy` on `run_date`
pub fn plan_resource(
    policy: &KindPolicy,
    templates: &MessageTemplates,
    resource: &Resource,
    run_date: NaiveDate,
) -> ResourcePlan {
    if let Some((tag, value)) = resource.exceptions.first() {
        let mut notice = Notice::for_resource(NoticeKind::SkipException, resource);
        notice.action = "skip".into();
        notice.tag = tag.clone();
        notice.old_date = Some(format_iso_date(run_date));
        notice.new_date = Some(value.clone());
        return ResourcePlan::notice_only(rendered(templates, notice));
    }

    let Some(state) = policy.state(&resource.state) else {
        let mut notice = Notice::for_resource(NoticeKind::IgnoreOtherStates, resource);
        notice.action = "ignore".into();
        notice.tag = resource.state.clone();
        notice.old_date = Some(format_iso_date(run_date));
        notice.new_date = Some(format_iso_date(run_date));
        return ResourcePlan::notice_only(rendered(templates, notice));
    };

    plan_state(policy, state, templates, resource, run_date)
}

fn plan_state(
    policy: &KindPolicy,
    state: &StatePolicy,
    templates: &MessageTemplates,
    resource: &Resource,
    run_date: NaiveDate,
) -> ResourcePlan {
    let current = resource.tag_date(&state.action_tag);
    let records: Vec<NotificationRecord> = state
        .schedule
        .iter()
        .map(|n| NotificationRecord::new(resource.tag_date(&n.tag), n.lead_days))
        .collect();

    let decision = decide(
        current,
        &records,
        state.default_days,
        state.max_days,
        run_date,
    );

    let mut changes = TagChanges::new();
    changes.set_date(resource, &state.action_tag, Some(decision.action_date));
    for (entry, recorded) in state.schedule.iter().zip(&decision.notifications) {
        changes.set_date(resource, &entry.tag, *recorded);
    }

    let mut main = Notice::for_resource(decision.classification.into(), resource);
    main.action = state.action_label().to_string();
    main.tag = state.action_tag.clone();
    main.old_date = current.map(format_iso_date);
    main.new_date = Some(format_iso_date(decision.action_date));
    main.rank = decision.rank;

    let mut plan = ResourcePlan {
        classification: Some(decision.classification),
        action: None,
        tag_changes: changes,
        notices: vec![rendered(templates, main)],
    };

    if decision.classification == Classification::CompleteAction {
        plan.action = state.action;
        complete(&mut plan, policy, state, templates, resource, &decision.notifications, run_date);
    }

    plan
}

/// Record completion, clear this state's tags and seed the next state
fn complete(
    plan: &mut ResourcePlan,
    policy: &KindPolicy,
    state: &StatePolicy,
    templates: &MessageTemplates,
    resource: &Resource,
    notified: &[Option<NaiveDate>],
    run_date: NaiveDate,
) {
    let log = notified
        .iter()
        .map(|d| format!("notified:{}", format_optional_date(*d)))
        .chain(std::iter::once(format!(
            "{}:{}",
            state.action_label(),
            format_iso_date(run_date)
        )))
        .collect::<Vec<_>>()
        .join("/");
    plan.tag_changes.set(resource, &state.log_tag, Some(log));

    plan.tag_changes.clear(resource, &state.action_tag);
    for tag in state.schedule.tags() {
        plan.tag_changes.clear(resource, tag);
    }

    let Some(next) = policy.next_state_of(state) else {
        return;
    };

    let next_date = add_days(run_date, next.default_days);
    plan.tag_changes
        .set_date(resource, &next.action_tag, Some(next_date));
    for tag in next.schedule.tags() {
        plan.tag_changes.clear(resource, tag);
    }

    let mut transition = Notice::for_resource(NoticeKind::TransitionAction, resource);
    transition.state = next.state.clone();
    transition.action = next.action_label().to_string();
    transition.tag = next.action_tag.clone();
    transition.new_date = Some(format_iso_date(next_date));
    plan.notices.push(rendered(templates, transition));
}

fn rendered(templates: &MessageTemplates, mut notice: Notice) -> Notice {
    notice.message = templates.render(&notice);
    notice
}

#[cfg(test)]
mod tests {
    use super::*;
    use reaper_api::ResourceKind;
    use reaper_config::parse_config;
    use reaper_util::Region;
    use std::collections::BTreeMap;

    const CONFIG: &str = r##"
        config_version = 1

        [messages]
        SEND_NOTIFICATION = "#{n} {instance_id} {action} {new_date}"

        [kinds.ec2]
        exceptions = ["reaper/exception"]

        [kinds.ec2.states.running]
        action = "stop"
        action_tag = "stop/date"
        log_tag = "stop/log"
        default_days = 31
        max_days = 62
        next_state = "stopped"
        notifications = { "stop/n1" = 15, "stop/n2" = 7, "stop/n3" = 2 }

        [kinds.ec2.states.stopped]
        action = "terminate"
        action_tag = "terminate/date"
        log_tag = "terminate/log"
        default_days = 30
        max_days = 60
        notifications = { "terminate/n1" = 10 }
    "##;

    fn ec2_policy() -> (KindPolicy, MessageTemplates) {
        let policy = parse_config(CONFIG).unwrap();
        let kind = policy.kind(ResourceKind::Ec2).unwrap().clone();
        (kind, policy.messages)
    }

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 15).unwrap()
    }

    fn instance(state: &str, tags: &[(&str, &str)]) -> Resource {
        Resource::new(
            ResourceKind::Ec2,
            "i-1",
            Region::new("us-east-1"),
            state,
            tags.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        )
        .with_exceptions_from(&["reaper/exception".to_string()])
    }

    fn new_value<'a>(plan: &'a ResourcePlan, tag: &str) -> Option<&'a str> {
        plan.tag_changes.get(tag).and_then(|c| c.new.as_deref())
    }

    #[test]
    fn new_resource_gets_action_date() {
        let (policy, templates) = ec2_policy();
        let plan = plan_resource(&policy, &templates, &instance("running", &[]), run_date());

        assert_eq!(plan.classification, Some(Classification::AddActionDate));
        assert_eq!(plan.action, None);
        assert_eq!(new_value(&plan, "stop/date"), Some("2024-08-15"));
        assert_eq!(plan.tag_changes.changed().len(), 1);
        assert_eq!(plan.notices.len(), 1);
        assert_eq!(plan.notices[0].kind, NoticeKind::AddActionDate);
        assert_eq!(plan.notices[0].old_date, None);
    }

    #[test]
    fn notification_renders_rank() {
        let (policy, templates) = ec2_policy();
        let r = instance("running", &[("stop/date", "2024-07-23")]);
        let plan = plan_resource(&policy, &templates, &r, run_date());

        assert_eq!(plan.classification, Some(Classification::SendNotification));
        assert_eq!(new_value(&plan, "stop/n1"), Some("2024-07-15"));
        assert_eq!(plan.notices[0].message, "#1 i-1 stop 2024-07-23");
        let changed = plan.tag_changes.changed();
        assert_eq!(changed.len(), 1);
        assert!(changed.get("stop/n1").is_some());
    }

    #[test]
    fn exception_skips_engine() {
        let (policy, templates) = ec2_policy();
        let r = instance("running", &[("reaper/exception", "until-2025")]);
        let plan = plan_resource(&policy, &templates, &r, run_date());

        assert_eq!(plan.classification, None);
        assert!(plan.tag_changes.is_empty());
        let notice = &plan.notices[0];
        assert_eq!(notice.kind, NoticeKind::SkipException);
        assert_eq!(notice.tag, "reaper/exception");
        assert_eq!(notice.new_date.as_deref(), Some("until-2025"));
    }

    #[test]
    fn unconfigured_state_is_ignored() {
        let (policy, templates) = ec2_policy();
        let plan = plan_resource(&policy, &templates, &instance("pending", &[]), run_date());

        assert_eq!(plan.classification, None);
        assert!(plan.tag_changes.is_empty());
        assert_eq!(plan.notices[0].kind, NoticeKind::IgnoreOtherStates);
        assert_eq!(plan.notices[0].tag, "pending");
    }

    #[test]
    fn completion_clears_logs_and_seeds_next_state() {
        let (policy, templates) = ec2_policy();
        let r = instance(
            "running",
            &[
                ("stop/date", "2024-07-15"),
                ("stop/n1", "2024-06-30"),
                ("stop/n2", "2024-07-08"),
                ("stop/n3", "2024-07-13"),
                ("terminate/n1", "2024-01-01"),
            ],
        );
        let plan = plan_resource(&policy, &templates, &r, run_date());

        assert_eq!(plan.classification, Some(Classification::CompleteAction));
        assert_eq!(plan.action, Some(ActionKind::Stop));
        assert_eq!(
            new_value(&plan, "stop/log"),
            Some("notified:2024-06-30/notified:2024-07-08/notified:2024-07-13/stop:2024-07-15")
        );
        for tag in ["stop/date", "stop/n1", "stop/n2", "stop/n3", "terminate/n1"] {
            assert_eq!(new_value(&plan, tag), None, "{tag} should be cleared");
        }
        assert_eq!(new_value(&plan, "terminate/date"), Some("2024-08-14"));

        let kinds: Vec<NoticeKind> = plan.notices.iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NoticeKind::CompleteAction, NoticeKind::TransitionAction]);
        let transition = &plan.notices[1];
        assert_eq!(transition.state, "stopped");
        assert_eq!(transition.action, "terminate");
        assert_eq!(transition.tag, "terminate/date");
        assert_eq!(transition.new_date.as_deref(), Some("2024-08-14"));
    }

    #[test]
    fn completion_without_next_state() {
        let (policy, templates) = ec2_policy();
        let r = instance(
            "stopped",
            &[("terminate/date", "2024-07-10"), ("terminate/n1", "2024-07-01")],
        );
        let plan = plan_resource(&policy, &templates, &r, run_date());

        assert_eq!(plan.action, Some(ActionKind::Terminate));
        assert_eq!(plan.notices.len(), 1);
        assert_eq!(
            new_value(&plan, "terminate/log"),
            Some("notified:2024-07-01/terminate:2024-07-15")
        );
        assert_eq!(new_value(&plan, "terminate/date"), None);
    }

    #[test]
    fn unparseable_date_reads_as_absent() {
        let (policy, templates) = ec2_policy();
        let r = instance("running", &[("stop/date", "next tuesday")]);
        let plan = plan_resource(&policy, &templates, &r, run_date());

        assert_eq!(plan.classification, Some(Classification::AddActionDate));
        let change = plan.tag_changes.get("stop/date").unwrap();
        assert_eq!(change.old.as_deref(), Some("next tuesday"));
        assert_eq!(change.new.as_deref(), Some("2024-08-15"));
    }
}
