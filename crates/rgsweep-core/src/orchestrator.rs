//! Cleanup orchestration

use futures::TryStreamExt;
use rgsweep_api::{LockInfo, ResourceGroupView, SkipReason};
use rgsweep_cloud_api::{CloudClient, CloudError};
use rgsweep_config::CleanupConfig;
use rgsweep_util::{RunId, error_chain, format_age, format_timestamp, mask_identifier};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span};

use crate::{AgeResolver, CleanupSummary, EligibilityPolicy, GroupOutcome, GroupReport};

/// Failure while processing a single group. Never ends the run.
#[derive(Debug, Error)]
pub enum GroupError {
    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error("processing exceeded the {0:?} deadline")]
    DeadlineExceeded(Duration),
}

/// Failure that ends the run
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to read subscription: {0}")]
    Subscription(#[source] CloudError),

    #[error("Failed to enumerate resource groups after {processed} groups: {source}")]
    Enumeration {
        processed: usize,
        #[source]
        source: CloudError,
    },
}

/// Drives one scan of the subscription
pub struct CleanupOrchestrator {
    cloud: Arc<dyn CloudClient>,
    policy: EligibilityPolicy,
    resolver: AgeResolver,
    dry_run: bool,
    group_timeout: Option<Duration>,
    run_id: RunId,
}

impl CleanupOrchestrator {
    pub fn new(cloud: Arc<dyn CloudClient>, config: &CleanupConfig) -> Self {
        let policy = EligibilityPolicy::from_config(config);
        let resolver = AgeResolver::new(policy.ttl());

        Self {
            cloud,
            policy,
            resolver,
            dry_run: config.dry_run,
            group_timeout: config.group_timeout,
            run_id: RunId::new(),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn policy(&self) -> &EligibilityPolicy {
        &self.policy
    }

    /// Scan every group in the subscription once
    pub async fn run(&self) -> Result<CleanupSummary, RunError> {
        let span = info_span!("cleanup_run", run_id = %self.run_id);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&self) -> Result<CleanupSummary, RunError> {
        let subscription = self
            .cloud
            .default_subscription()
            .await
            .map_err(RunError::Subscription)?;

        info!(
            subscription = %subscription.display_name,
            subscription_id = %mask_identifier(&subscription.subscription_id),
            ttl_hours = self.policy.ttl_hours(),
            dry_run = self.dry_run,
            "Scanning subscription"
        );

        let mut summary = CleanupSummary::new(
            self.run_id.clone(),
            subscription,
            rgsweep_util::now(),
            self.dry_run,
        );

        let mut groups = self.cloud.list_resource_groups();
        loop {
            let group = match groups.try_next().await {
                Ok(Some(group)) => group,
                Ok(None) => break,
                Err(source) => {
                    error!(
                        processed = summary.total(),
                        deleted = summary.deleted(),
                        error = %source,
                        "Resource group enumeration failed"
                    );
                    return Err(RunError::Enumeration {
                        processed: summary.total(),
                        source,
                    });
                }
            };

            let report = self.process_group(&group).await;
            summary.record(report);
        }

        summary.finish(rgsweep_util::now());
        summary.log();
        Ok(summary)
    }

    /// Process one group, absorbing any failure into the report
    async fn process_group(&self, group: &ResourceGroupView) -> GroupReport {
        let result = match self.group_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.evaluate_group(group)).await {
                Ok(result) => result,
                Err(_) => Err(GroupError::DeadlineExceeded(limit)),
            },
            None => self.evaluate_group(group).await,
        };

        match result {
            Ok(report) => report,
            Err(e) => {
                error!(group = %group.name, error = %error_chain(&e), "Failed to process resource group");
                GroupReport::new(
                    group.name.clone(),
                    GroupOutcome::Failed {
                        error: error_chain(&e),
                    },
                )
            }
        }
    }

    async fn evaluate_group(&self, group: &ResourceGroupView) -> Result<GroupReport, GroupError> {
        let name = group.name.as_str();

        if let Some(reason) = self.policy.check_reserved(name).and_then(|r| r.reason) {
            return Ok(self.skip(group, reason, false));
        }

        let locks: Vec<LockInfo> = self.cloud.list_locks(group).try_collect().await?;
        let is_locked = EligibilityPolicy::is_locked(&locks);
        if let Some(reason) = self.policy.check_locked(is_locked).and_then(|r| r.reason) {
            return Ok(self.skip(group, reason, false));
        }

        let now = rgsweep_util::now();
        let age = self
            .resolver
            .resolve(group, || self.cloud.list_child_resources(group), now)
            .await?;

        debug!(
            group = %name,
            created_on = %format_timestamp(&age.created_on),
            age = %format_age(now - age.created_on),
            source = %age.source,
            "Resolved creation time"
        );

        let mut backfilled = false;
        if age.requires_backfill() {
            let tags = age.backfill_tags(group.tags.as_ref());
            if self.dry_run {
                info!(group = %name, "Dry run: would backfill CreatedTime tag");
            } else {
                self.cloud.set_tags(group, tags).await?;
                info!(group = %name, created_on = %format_timestamp(&age.created_on), "Backfilled CreatedTime tag");
                backfilled = true;
            }
        }

        let result = self.policy.evaluate(name, is_locked, age.created_on, now);
        match result.reason {
            Some(reason) => Ok(self.skip(group, reason, backfilled)),
            None if self.dry_run => {
                info!(group = %name, age = %format_age(now - age.created_on), "Dry run: would delete resource group");
                Ok(GroupReport::new(group.name.clone(), GroupOutcome::WouldDelete))
            }
            None => {
                info!(group = %name, age = %format_age(now - age.created_on), "Deleting resource group");
                self.cloud.delete_resource_group(group).await?;
                info!(group = %name, "Deleted resource group");
                Ok(GroupReport::new(group.name.clone(), GroupOutcome::Deleted).with_backfill(backfilled))
            }
        }
    }

    fn skip(&self, group: &ResourceGroupView, reason: SkipReason, backfilled: bool) -> GroupReport {
        info!(group = %group.name, reason = %reason, "Skipping resource group");
        GroupReport::new(group.name.clone(), GroupOutcome::Skipped { reason }).with_backfill(backfilled)
    }
}
