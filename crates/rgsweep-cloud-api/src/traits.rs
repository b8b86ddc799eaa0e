//! Cloud client trait

use async_trait::async_trait;
use futures::stream::BoxStream;
use rgsweep_api::{ChildResource, LockInfo, ResourceGroupView, SubscriptionInfo};
use std::collections::HashMap;
use thiserror::Error;

use crate::CredentialError;

/// Errors from remote calls. Scoped to the group being processed.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("{operation}: transport error: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    #[error("{operation}: HTTP {status} {code}: {message}")]
    Api {
        operation: &'static str,
        status: u16,
        code: String,
        message: String,
    },

    #[error("{operation}: malformed response: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    #[error("{operation}: operation ended with status {status}: {message}")]
    OperationFailed {
        operation: &'static str,
        status: String,
        message: String,
    },

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
}

impl CloudError {
    pub fn transport(operation: &'static str, message: impl ToString) -> Self {
        Self::Transport {
            operation,
            message: message.to_string(),
        }
    }

    pub fn api(
        operation: &'static str,
        status: u16,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Api {
            operation,
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn decode(operation: &'static str, message: impl ToString) -> Self {
        Self::Decode {
            operation,
            message: message.to_string(),
        }
    }

    /// HTTP status for API errors
    pub fn status(&self) -> Option<u16> {
        match self {
            CloudError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type CloudResult<T> = Result<T, CloudError>;

/// Lazily paged listing. Nothing is fetched until the stream is polled.
pub type CloudStream<'a, T> = BoxStream<'a, CloudResult<T>>;

/// Resource management operations used by the cleanup core.
///
/// Implementations are bound to a single subscription.
#[async_trait]
pub trait CloudClient: Send + Sync {
    /// The subscription this client operates on
    async fn default_subscription(&self) -> CloudResult<SubscriptionInfo>;

    /// All resource groups in the subscription
    fn list_resource_groups(&self) -> CloudStream<'_, ResourceGroupView>;

    /// Management locks applied at the group's scope
    fn list_locks<'a>(&'a self, group: &ResourceGroupView) -> CloudStream<'a, LockInfo>;

    /// Resources contained in the group
    fn list_child_resources<'a>(&'a self, group: &ResourceGroupView) -> CloudStream<'a, ChildResource>;

    /// Replace the group's tags
    async fn set_tags(&self, group: &ResourceGroupView, tags: HashMap<String, String>) -> CloudResult<()>;

    /// Delete the group and wait until the deletion has completed
    async fn delete_resource_group(&self, group: &ResourceGroupView) -> CloudResult<()>;
}
