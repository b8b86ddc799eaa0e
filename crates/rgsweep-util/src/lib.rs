//! Shared utilities for rgsweep
//!
//! This crate provides:
//! - ID types (GroupName, RunId)
//! - Error chain formatting for logs
//! - Time utilities (UTC clock with mock override, timestamp parsing)
//! - Masking helpers for identifiers printed at startup
//! - Default paths for the configuration file

mod error;
mod ids;
mod mask;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use mask::*;
pub use paths::*;
pub use time::*;
