//! Eligibility verdicts

use serde::{Deserialize, Serialize};
use std::fmt;

/// What should happen to a resource group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Keep,
    Delete,
}

/// Why a group was kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SkipReason {
    /// Name matches a well-known or configured reserved group
    Reserved,
    /// At least one management lock forbids deletion
    Locked,
    /// Younger than the configured TTL
    WithinTtl { ttl_hours: u32 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Reserved => f.write_str("known reserved group."),
            SkipReason::Locked => f.write_str("locked from deletion."),
            SkipReason::WithinTtl { ttl_hours } => {
                write!(f, "resource group was created within {} hours.", ttl_hours)
            }
        }
    }
}

/// Outcome of evaluating a single group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub verdict: Verdict,
    /// Populated when the verdict is `Keep`
    pub reason: Option<SkipReason>,
}

impl EligibilityResult {
    pub fn keep(reason: SkipReason) -> Self {
        Self {
            verdict: Verdict::Keep,
            reason: Some(reason),
        }
    }

    pub fn delete() -> Self {
        Self {
            verdict: Verdict::Delete,
            reason: None,
        }
    }

    pub fn is_keep(&self) -> bool {
        self.verdict == Verdict::Keep
    }

    /// Human-readable skip reason, if any
    pub fn reason_message(&self) -> Option<String> {
        self.reason.map(|r| r.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_reason_messages() {
        assert_eq!(SkipReason::Reserved.to_string(), "known reserved group.");
        assert_eq!(SkipReason::Locked.to_string(), "locked from deletion.");
        assert_eq!(
            SkipReason::WithinTtl { ttl_hours: 168 }.to_string(),
            "resource group was created within 168 hours."
        );
    }

    #[test]
    fn keep_carries_reason_delete_does_not() {
        let keep = EligibilityResult::keep(SkipReason::Locked);
        assert!(keep.is_keep());
        assert_eq!(keep.reason_message().as_deref(), Some("locked from deletion."));

        let delete = EligibilityResult::delete();
        assert!(!delete.is_keep());
        assert_eq!(delete.reason_message(), None);
    }

    #[test]
    fn skip_reason_serializes_tagged() {
        let json = serde_json::to_string(&SkipReason::WithinTtl { ttl_hours: 24 }).unwrap();
        assert_eq!(json, r#"{"type":"within_ttl","ttl_hours":24}"#);
    }
}
