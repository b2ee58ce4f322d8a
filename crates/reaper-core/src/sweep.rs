//! Sweep orchestration
//!
//! The [`Sweeper`] walks every region and enabled kind, plans each resource
//! and applies the plan: action first, then tag writes, then notices. Failures
//! are isolated to the resource (or kind listing) that hit them.

use chrono::NaiveDate;
use reaper_api::{NoticeKind, Resource, ResourceKind};
use reaper_cloud_api::{CloudAdapter, CloudError, Notifier, ResourceQuery};
use reaper_config::{KindPolicy, Policy};
use reaper_store::{AuditEvent, AuditEventType, Store};
use reaper_util::{Region, ResourceId, RunId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{plan_resource, ResourcePlan};

/// Errors that stop a run before any resource is processed
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Failed to list regions: {0}")]
    Regions(#[source] CloudError),
}

pub type SweepResult<T> = Result<T, SweepError>;

/// Run-wide options
#[derive(Debug, Clone)]
pub struct SweepOptions {
    pub run_date: NaiveDate,
    /// Real date, used to tell simulated runs apart
    pub today: NaiveDate,
    pub dry_run: bool,
    /// Overrides the configured regions when non-empty
    pub regions: Vec<Region>,
}

impl SweepOptions {
    pub fn new(run_date: NaiveDate) -> Self {
        Self {
            run_date,
            today: reaper_util::today(),
            dry_run: false,
            regions: Vec::new(),
        }
    }

    pub fn is_simulated(&self) -> bool {
        self.run_date != self.today
    }
}

/// A provider call that failed during a run
#[derive(Debug, Clone, Serialize)]
pub struct SweepFailure {
    pub region: Region,
    pub kind: ResourceKind,
    /// Absent when listing the kind failed
    pub resource_id: Option<ResourceId>,
    pub error: String,
}

/// Outcome of one run
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub run_id: RunId,
    pub run_date: NaiveDate,
    pub dry_run: bool,
    pub regions: Vec<Region>,
    pub notices: BTreeMap<NoticeKind, usize>,
    pub actions: usize,
    pub failures: Vec<SweepFailure>,
    pub interrupted: bool,
}

impl SweepReport {
    fn new(run_id: RunId, options: &SweepOptions) -> Self {
        Self {
            run_id,
            run_date: options.run_date,
            dry_run: options.dry_run,
            regions: Vec::new(),
            notices: BTreeMap::new(),
            actions: 0,
            failures: Vec::new(),
            interrupted: false,
        }
    }

    pub fn count(&self, kind: NoticeKind) -> usize {
        self.notices.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_notices(&self) -> usize {
        self.notices.values().sum()
    }
}

/// Drives one run over every region and enabled kind
pub struct Sweeper {
    policy: Policy,
    cloud: Arc<dyn CloudAdapter>,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn Store>,
    options: SweepOptions,
    run_id: RunId,
}

impl Sweeper {
    pub fn new(
        policy: Policy,
        cloud: Arc<dyn CloudAdapter>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn Store>,
        options: SweepOptions,
    ) -> Self {
        info!(
            kinds = policy.enabled_kinds().count(),
            run_date = %options.run_date,
            dry_run = options.dry_run,
            "Sweeper initialized"
        );

        Self {
            policy,
            cloud,
            notifier,
            store,
            options,
            run_id: RunId::new(),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Run the sweep. A `true` on `shutdown` stops it between resources.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> SweepResult<SweepReport> {
        let mut report = SweepReport::new(self.run_id.clone(), &self.options);

        self.audit(AuditEventType::RunStarted {
            run_id: self.run_id.clone(),
            run_date: self.options.run_date,
            dry_run: self.options.dry_run,
        });
        self.announce(&self.run_line("Running cleaner on")).await;

        let regions = self.resolve_regions().await?;
        let names: Vec<&str> = regions.iter().map(Region::as_str).collect();
        self.announce(&format!("Using regions: {}", names.join(", ")))
            .await;
        report.regions = regions.clone();

        'regions: for region in &regions {
            let kinds: Vec<&str> = self
                .policy
                .enabled_kinds()
                .map(|k| k.kind.as_str())
                .collect();
            self.announce(&format!(
                "Processing {} in region {}",
                kinds.join(", "),
                region
            ))
            .await;

            for kind_policy in self.policy.enabled_kinds() {
                if *shutdown.borrow() {
                    report.interrupted = true;
                    break 'regions;
                }
                if !self
                    .sweep_kind(region, kind_policy, &shutdown, &mut report)
                    .await
                {
                    report.interrupted = true;
                    break 'regions;
                }
            }
        }

        if report.interrupted {
            info!(run_id = %self.run_id, "Sweep interrupted");
            self.announce("Aborted by user!").await;
        } else {
            self.announce(&self.run_line("Finished running cleaner on"))
                .await;
        }

        self.audit(AuditEventType::RunFinished {
            run_id: self.run_id.clone(),
            notices: report.total_notices(),
            actions: report.actions,
            failures: report.failures.len(),
            interrupted: report.interrupted,
        });

        info!(
            run_id = %self.run_id,
            notices = report.total_notices(),
            actions = report.actions,
            failures = report.failures.len(),
            "Sweep finished"
        );

        Ok(report)
    }

    async fn resolve_regions(&self) -> SweepResult<Vec<Region>> {
        if !self.options.regions.is_empty() {
            return Ok(self.options.regions.clone());
        }
        if !self.policy.global.regions.is_empty() {
            info!("Using regions provided in global.regions");
            return Ok(self.policy.global.regions.clone());
        }
        self.cloud.list_regions().await.map_err(SweepError::Regions)
    }

    /// Sweep one kind in one region. Returns `false` when interrupted.
    async fn sweep_kind(
        &self,
        region: &Region,
        kind_policy: &KindPolicy,
        shutdown: &watch::Receiver<bool>,
        report: &mut SweepReport,
    ) -> bool {
        let kind = kind_policy.kind;
        self.announce(&format!("Retrieving {} instances from region {}", kind, region))
            .await;

        let query = ResourceQuery {
            exception_tags: kind_policy.exception_tags.clone(),
            email_tags: self.policy.global.email_tags.clone(),
            filters: kind_policy.filters.clone(),
        };
        let resources = match self.cloud.list_resources(region, kind, &query).await {
            Ok(resources) => resources,
            Err(e) => {
                error!(region = %region, kind = %kind, error = %e, "Listing resources failed");
                self.record_failure(report, region, kind, None, &e);
                return true;
            }
        };

        self.announce_counts(kind_policy, &resources).await;

        for resource in &resources {
            if *shutdown.borrow() {
                return false;
            }
            info!(
                state = %resource.state,
                kind = %kind,
                resource_id = %resource.id,
                name = %resource.display_name(),
                region = %region,
                excepted = resource.is_excepted(),
                "Processing resource"
            );
            let plan = plan_resource(
                kind_policy,
                &self.policy.messages,
                resource,
                self.options.run_date,
            );
            self.apply(resource, plan, report).await;
        }

        true
    }

    async fn announce_counts(&self, kind_policy: &KindPolicy, resources: &[Resource]) {
        let mut handled: BTreeMap<&str, usize> = BTreeMap::new();
        let mut unhandled: BTreeMap<&str, usize> = BTreeMap::new();
        for resource in resources {
            let counts = if kind_policy.state(&resource.state).is_some() {
                &mut handled
            } else {
                &mut unhandled
            };
            *counts.entry(resource.state.as_str()).or_default() += 1;
        }

        let summary = |counts: &BTreeMap<&str, usize>| {
            counts
                .iter()
                .map(|(state, n)| format!("{} {}", n, state))
                .collect::<Vec<_>>()
                .join(", ")
        };

        self.announce(&format!(
            "Total {} instances found: {}",
            kind_policy.kind,
            resources.len()
        ))
        .await;
        if !handled.is_empty() {
            self.announce(&format!(
                "{} will be processed: {}",
                handled.values().sum::<usize>(),
                summary(&handled)
            ))
            .await;
        }
        if !unhandled.is_empty() {
            self.announce(&format!(
                "{} will not be processed (not currently handled): {}",
                unhandled.values().sum::<usize>(),
                summary(&unhandled)
            ))
            .await;
        }
    }

    /// Apply a plan: action, then tag writes, then notices
    async fn apply(&self, resource: &Resource, plan: ResourcePlan, report: &mut SweepReport) {
        if let Some(action) = plan.action {
            if self.options.dry_run {
                info!(resource_id = %resource.id, action = %action, "Dry run: skipping action");
            } else {
                if let Err(e) = self.cloud.do_action(resource, action).await {
                    error!(
                        resource_id = %resource.id,
                        action = %action,
                        error = %e,
                        "Action failed; tags left unchanged"
                    );
                    self.record_failure(report, &resource.region, resource.kind, Some(resource), &e);
                    return;
                }
                info!(resource_id = %resource.id, action = %action, "Action executed");
                report.actions += 1;
                self.audit(AuditEventType::ActionExecuted {
                    run_id: self.run_id.clone(),
                    resource_kind: resource.kind,
                    resource_id: resource.id.clone(),
                    region: resource.region.clone(),
                    action,
                });
            }
        }

        let changed = plan.tag_changes.changed();
        if !changed.is_empty() {
            if self.options.dry_run {
                debug!(resource_id = %resource.id, count = changed.len(), "Dry run: skipping tag writes");
            } else if let Err(e) = self.cloud.update_tags(resource, &changed).await {
                error!(
                    resource_id = %resource.id,
                    error = %e,
                    "Tag update failed; notices withheld"
                );
                self.record_failure(report, &resource.region, resource.kind, Some(resource), &e);
                return;
            }
        }

        for notice in plan.notices {
            info!(
                result = %notice.kind,
                resource_id = %notice.resource_id,
                email = notice.email.as_deref().unwrap_or("None"),
                message = %notice.message,
                "Notice"
            );
            *report.notices.entry(notice.kind).or_default() += 1;

            if let Err(e) = self
                .notifier
                .send_channel(&notice.channel_line(self.options.dry_run))
                .await
            {
                warn!(error = %e, "Channel notification failed");
            }

            if !self.options.dry_run
                && notice.directs_owner()
                && let Some(email) = notice.email.as_deref()
                && let Err(e) = self.notifier.send_direct(email, &notice.message).await
            {
                warn!(email, error = %e, "Direct notification failed");
            }

            self.audit(AuditEventType::ResourceNotice {
                run_id: self.run_id.clone(),
                notice,
            });
        }
    }

    fn record_failure(
        &self,
        report: &mut SweepReport,
        region: &Region,
        kind: ResourceKind,
        resource: Option<&Resource>,
        error: &CloudError,
    ) {
        let failure = SweepFailure {
            region: region.clone(),
            kind,
            resource_id: resource.map(|r| r.id.clone()),
            error: error.to_string(),
        };
        self.audit(AuditEventType::ResourceFailed {
            run_id: self.run_id.clone(),
            resource_kind: kind,
            resource_id: failure.resource_id.clone(),
            region: region.clone(),
            error: failure.error.clone(),
        });
        report.failures.push(failure);
    }

    fn run_line(&self, prefix: &str) -> String {
        if self.options.is_simulated() {
            format!("{} simulated run date of {}", prefix, self.options.run_date)
        } else {
            format!("{} {}", prefix, self.options.run_date)
        }
    }

    /// Log a line and broadcast it to the channel
    async fn announce(&self, text: &str) {
        info!("{}", text);
        if let Err(e) = self.notifier.send_channel(text).await {
            warn!(error = %e, "Channel notification failed");
        }
    }

    fn audit(&self, event: AuditEventType) {
        if let Err(e) = self.store.append_audit(AuditEvent::new(event)) {
            warn!(error = %e, "Failed to append audit event");
        }
    }
}
