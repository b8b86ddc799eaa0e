//! Cleanup engine for rgsweep
//!
//! This crate is the heart of rgsweep, containing:
//! - Eligibility policy (reserved, locked, within TTL, delete)
//! - Creation time resolution from metadata, tags and contained resources
//! - Per-group orchestration with failure isolation
//! - Run summary reporting

mod age;
mod eligibility;
mod orchestrator;
mod report;

pub use age::*;
pub use eligibility::*;
pub use orchestrator::*;
pub use report::*;
