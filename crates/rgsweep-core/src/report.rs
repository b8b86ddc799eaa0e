//! Run report

use chrono::{DateTime, Utc};
use rgsweep_api::{SkipReason, SubscriptionInfo};
use rgsweep_util::{GroupName, RunId};
use tracing::info;

/// What happened to one resource group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOutcome {
    Skipped { reason: SkipReason },
    Deleted,
    /// Eligible, but the run is a dry run
    WouldDelete,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    pub name: GroupName,
    pub outcome: GroupOutcome,
    /// A `CreatedTime` tag was written during this run
    pub backfilled: bool,
}

impl GroupReport {
    pub fn new(name: GroupName, outcome: GroupOutcome) -> Self {
        Self {
            name,
            outcome,
            backfilled: false,
        }
    }

    pub fn with_backfill(mut self, backfilled: bool) -> Self {
        self.backfilled = backfilled;
        self
    }
}

/// Aggregated outcome of one run
#[derive(Debug, Clone)]
pub struct CleanupSummary {
    pub run_id: RunId,
    pub subscription: SubscriptionInfo,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub groups: Vec<GroupReport>,
}

impl CleanupSummary {
    pub fn new(run_id: RunId, subscription: SubscriptionInfo, started_at: DateTime<Utc>, dry_run: bool) -> Self {
        Self {
            run_id,
            subscription,
            started_at,
            finished_at: None,
            dry_run,
            groups: Vec::new(),
        }
    }

    pub fn record(&mut self, report: GroupReport) {
        self.groups.push(report);
    }

    pub fn finish(&mut self, now: DateTime<Utc>) {
        self.finished_at = Some(now);
    }

    pub fn total(&self) -> usize {
        self.groups.len()
    }

    pub fn deleted(&self) -> usize {
        self.count(|o| matches!(o, GroupOutcome::Deleted))
    }

    pub fn would_delete(&self) -> usize {
        self.count(|o| matches!(o, GroupOutcome::WouldDelete))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, GroupOutcome::Skipped { .. }))
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.count(|o| matches!(o, GroupOutcome::Skipped { reason: r } if *r == reason))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, GroupOutcome::Failed { .. }))
    }

    pub fn backfilled(&self) -> usize {
        self.groups.iter().filter(|g| g.backfilled).count()
    }

    /// Outcome recorded for a group, if it was seen this run
    pub fn outcome_of(&self, name: &str) -> Option<&GroupOutcome> {
        self.groups
            .iter()
            .find(|g| g.name.as_str() == name)
            .map(|g| &g.outcome)
    }

    fn count(&self, predicate: impl Fn(&GroupOutcome) -> bool) -> usize {
        self.groups.iter().filter(|g| predicate(&g.outcome)).count()
    }

    /// Emit the run totals
    pub fn log(&self) {
        let elapsed_secs = self
            .finished_at
            .map(|end| (end - self.started_at).num_seconds())
            .unwrap_or_default();

        info!(
            run_id = %self.run_id,
            subscription = %self.subscription.display_name,
            total = self.total(),
            deleted = self.deleted(),
            would_delete = self.would_delete(),
            skipped = self.skipped(),
            failed = self.failed(),
            backfilled = self.backfilled(),
            dry_run = self.dry_run,
            elapsed_secs,
            "Cleanup run complete"
        );
    }
}
