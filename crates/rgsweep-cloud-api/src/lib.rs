//! Cloud collaborator interfaces for rgsweep
//!
//! This crate defines the seam between the cleanup core and a concrete
//! cloud implementation. It contains no network code itself.

mod credential;
mod mock;
mod traits;

pub use credential::*;
pub use mock::*;
pub use traits::*;
