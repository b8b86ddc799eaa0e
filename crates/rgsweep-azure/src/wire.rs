//! Resource Manager JSON payloads

use chrono::{DateTime, Utc};
use rgsweep_api::{ChildResource, LockInfo, LockLevel, ResourceGroupView, SubscriptionInfo};
use rgsweep_util::{GroupName, parse_timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One page of a list response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    pub next_link: Option<String>,
}

impl<T> Page<T> {
    /// Continuation URL, if another page follows
    pub fn next(&self) -> Option<String> {
        self.next_link
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SystemData {
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubscriptionWire {
    pub subscription_id: String,
    #[serde(default)]
    pub display_name: String,
}

impl From<SubscriptionWire> for SubscriptionInfo {
    fn from(wire: SubscriptionWire) -> Self {
        SubscriptionInfo {
            subscription_id: wire.subscription_id,
            display_name: wire.display_name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResourceGroupWire {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    pub tags: Option<HashMap<String, String>>,
    pub system_data: Option<SystemData>,
}

impl From<ResourceGroupWire> for ResourceGroupView {
    fn from(wire: ResourceGroupWire) -> Self {
        ResourceGroupView {
            id: wire.id,
            name: GroupName::new(wire.name),
            location: wire.location,
            tags: wire.tags,
            system_created_on: created_at(&wire.system_data),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LockWire {
    pub name: Option<String>,
    pub properties: LockProperties,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LockProperties {
    pub level: String,
}

impl From<LockWire> for LockInfo {
    fn from(wire: LockWire) -> Self {
        LockInfo {
            name: wire.name,
            level: LockLevel::parse(&wire.properties.level),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenericResourceWire {
    pub id: String,
    /// Populated when listing with `$expand=createdTime`
    pub created_time: Option<String>,
    pub system_data: Option<SystemData>,
}

impl From<GenericResourceWire> for ChildResource {
    fn from(wire: GenericResourceWire) -> Self {
        let expanded = wire.created_time.as_deref().and_then(parse_timestamp);
        let system = created_at(&wire.system_data);
        let created_on = match (expanded, system) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        ChildResource {
            id: wire.id,
            created_on,
        }
    }
}

/// Body of a resource group PATCH that replaces tags
#[derive(Debug, Serialize)]
pub(crate) struct TagsPatch<'a> {
    pub tags: &'a HashMap<String, String>,
}

/// `{ "error": { "code": ..., "message": ... } }`
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Body returned by an `Azure-AsyncOperation` status URL
#[derive(Debug, Deserialize)]
pub(crate) struct AsyncOperationStatus {
    pub status: String,
    pub error: Option<ErrorDetail>,
}

fn created_at(system_data: &Option<SystemData>) -> Option<DateTime<Utc>> {
    system_data
        .as_ref()
        .and_then(|sd| sd.created_at.as_deref())
        .and_then(parse_timestamp)
}
