//! Azure Resource Manager implementation for rgsweep
//!
//! Provides:
//! - Endpoint selection per cloud instance
//! - Client certificate and Azure CLI credentials
//! - Paged listings of resource groups, locks and resources
//! - Resource group deletion with long-running operation polling

mod certificate;
mod client;
mod credential;
mod endpoints;
mod poller;
mod wire;

pub use certificate::*;
pub use client::*;
pub use credential::*;
pub use endpoints::*;
