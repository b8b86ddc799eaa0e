//! Shared data model for rgsweep
//!
//! This crate defines the types exchanged between the cloud layer and the
//! cleanup core:
//! - Cloud instances and credential modes
//! - Resource group, lock and child resource views
//! - Eligibility verdicts and skip reasons

mod decision;
mod types;

pub use decision::*;
pub use types::*;

/// Tag written onto groups whose creation time could not be determined
pub const CREATED_TIME_TAG: &str = "CreatedTime";
