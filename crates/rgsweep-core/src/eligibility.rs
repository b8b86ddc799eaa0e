//! Eligibility policy

use chrono::{DateTime, Utc};
use rgsweep_api::{EligibilityResult, LockInfo, SkipReason};
use rgsweep_config::{CleanupConfig, ReservedGroups};

/// Decides whether a resource group may be deleted.
///
/// Rules apply in order, first match wins: reserved prefix, reserved name,
/// deletion-forbidding lock, younger than the TTL. Anything else is deleted.
#[derive(Debug, Clone)]
pub struct EligibilityPolicy {
    ttl_hours: u32,
    reserved: ReservedGroups,
}

impl EligibilityPolicy {
    pub fn new(ttl_hours: u32, reserved: ReservedGroups) -> Self {
        Self { ttl_hours, reserved }
    }

    pub fn from_config(config: &CleanupConfig) -> Self {
        Self::new(config.ttl_hours, config.reserved.clone())
    }

    pub fn ttl_hours(&self) -> u32 {
        self.ttl_hours
    }

    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.ttl_hours))
    }

    /// Reserved by prefix or exact name. Needs no remote call.
    pub fn check_reserved(&self, name: &str) -> Option<EligibilityResult> {
        if self.reserved.matches_prefix(name) || self.reserved.matches_name(name) {
            Some(EligibilityResult::keep(SkipReason::Reserved))
        } else {
            None
        }
    }

    pub fn check_locked(&self, is_locked: bool) -> Option<EligibilityResult> {
        is_locked.then(|| EligibilityResult::keep(SkipReason::Locked))
    }

    /// True when any lock forbids deletion
    pub fn is_locked(locks: &[LockInfo]) -> bool {
        locks.iter().any(|lock| lock.level.forbids_deletion())
    }

    /// A group is expired once `created_on + ttl` is at or before `now`.
    /// An expiry past the representable range never arrives.
    pub fn is_expired(&self, created_on: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        created_on
            .checked_add_signed(self.ttl())
            .is_some_and(|expiry| expiry <= now)
    }

    /// Full evaluation. Pure: same inputs, same result.
    pub fn evaluate(
        &self,
        name: &str,
        is_locked: bool,
        created_on: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> EligibilityResult {
        if let Some(result) = self.check_reserved(name) {
            return result;
        }

        if let Some(result) = self.check_locked(is_locked) {
            return result;
        }

        if !self.is_expired(created_on, now) {
            return EligibilityResult::keep(SkipReason::WithinTtl {
                ttl_hours: self.ttl_hours,
            });
        }

        EligibilityResult::delete()
    }
}
