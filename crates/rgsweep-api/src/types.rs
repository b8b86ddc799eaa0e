//! Shared types for the rgsweep data model

use chrono::{DateTime, Utc};
use rgsweep_util::GroupName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Sovereign cloud environment the subscription lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloudInstance {
    #[serde(alias = "AzurePublic")]
    Public,
    #[serde(alias = "AzureUsGovernment")]
    UsGovernment,
    #[serde(alias = "AzureChina")]
    China,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported cloud instance '{0}' (expected Public, UsGovernment or China)")]
pub struct UnsupportedCloudInstance(pub String);

impl FromStr for CloudInstance {
    type Err = UnsupportedCloudInstance;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" | "azurepublic" | "azurepubliccloud" => Ok(Self::Public),
            "usgovernment" | "azureusgovernment" | "usgov" => Ok(Self::UsGovernment),
            "china" | "azurechina" | "azurechinacloud" => Ok(Self::China),
            _ => Err(UnsupportedCloudInstance(s.to_string())),
        }
    }
}

impl fmt::Display for CloudInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CloudInstance::Public => "AzurePublic",
            CloudInstance::UsGovernment => "AzureUsGovernment",
            CloudInstance::China => "AzureChina",
        };
        f.write_str(name)
    }
}

/// How the agent authenticates against the cloud
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialMode {
    /// Developer credential already present on the machine (Azure CLI login)
    Ambient,
    /// Service principal authenticated with a client certificate
    Certificate,
}

impl FromStr for CredentialMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ambient" | "default" | "cli" => Ok(Self::Ambient),
            "certificate" | "cert" => Ok(Self::Certificate),
            other => Err(format!("Unknown credential mode: {}", other)),
        }
    }
}

impl fmt::Display for CredentialMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialMode::Ambient => f.write_str("ambient"),
            CredentialMode::Certificate => f.write_str("certificate"),
        }
    }
}

/// Subscription the agent is scoped to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub subscription_id: String,
    pub display_name: String,
}

/// A resource group as seen by the cleanup core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroupView {
    /// Fully qualified resource id
    pub id: String,
    pub name: GroupName,
    pub location: Option<String>,
    /// Absent when the group has never been tagged
    pub tags: Option<HashMap<String, String>>,
    /// Creation time from the platform's system metadata
    pub system_created_on: Option<DateTime<Utc>>,
}

impl ResourceGroupView {
    pub fn new(name: impl Into<GroupName>) -> Self {
        let name = name.into();
        Self {
            id: format!("/resourceGroups/{}", name),
            name,
            location: None,
            tags: None,
            system_created_on: None,
        }
    }

    pub fn with_created_on(mut self, created_on: DateTime<Utc>) -> Self {
        self.system_created_on = Some(created_on);
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Look up a tag value. Tag names are case-insensitive in the cloud.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.as_ref().and_then(|tags| {
            tags.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str())
        })
    }
}

/// Management lock level
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockLevel {
    CanNotDelete,
    ReadOnly,
    NotSpecified,
    Other(String),
}

impl LockLevel {
    pub fn parse(level: &str) -> Self {
        match level {
            l if l.eq_ignore_ascii_case("CanNotDelete") => LockLevel::CanNotDelete,
            l if l.eq_ignore_ascii_case("ReadOnly") => LockLevel::ReadOnly,
            l if l.eq_ignore_ascii_case("NotSpecified") => LockLevel::NotSpecified,
            other => LockLevel::Other(other.to_string()),
        }
    }

    /// Whether a lock at this level prevents the group from being deleted.
    /// A read-only lock blocks every write, deletes included.
    pub fn forbids_deletion(&self) -> bool {
        matches!(self, LockLevel::CanNotDelete | LockLevel::ReadOnly)
    }
}

/// A management lock attached to a resource group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub name: Option<String>,
    pub level: LockLevel,
}

impl LockInfo {
    pub fn new(level: LockLevel) -> Self {
        Self { name: None, level }
    }
}

/// A resource contained in a resource group; only its age matters here
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildResource {
    pub id: String,
    pub created_on: Option<DateTime<Utc>>,
}

impl ChildResource {
    pub fn new(id: impl Into<String>, created_on: Option<DateTime<Utc>>) -> Self {
        Self {
            id: id.into(),
            created_on,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloud_instance_parsing() {
        assert_eq!("Public".parse::<CloudInstance>().unwrap(), CloudInstance::Public);
        assert_eq!("AzurePublic".parse::<CloudInstance>().unwrap(), CloudInstance::Public);
        assert_eq!(
            "azureusgovernment".parse::<CloudInstance>().unwrap(),
            CloudInstance::UsGovernment
        );
        assert_eq!(" China ".parse::<CloudInstance>().unwrap(), CloudInstance::China);
        assert!("AzureGermany".parse::<CloudInstance>().is_err());
    }

    #[test]
    fn cloud_instance_display_parses_back() {
        for instance in [CloudInstance::Public, CloudInstance::UsGovernment, CloudInstance::China] {
            assert_eq!(instance.to_string().parse::<CloudInstance>().unwrap(), instance);
        }
    }

    #[test]
    fn lock_levels() {
        assert_eq!(LockLevel::parse("CanNotDelete"), LockLevel::CanNotDelete);
        assert_eq!(LockLevel::parse("readonly"), LockLevel::ReadOnly);
        assert_eq!(LockLevel::parse("Custom"), LockLevel::Other("Custom".into()));

        assert!(LockLevel::CanNotDelete.forbids_deletion());
        assert!(LockLevel::ReadOnly.forbids_deletion());
        assert!(!LockLevel::NotSpecified.forbids_deletion());
        assert!(!LockLevel::Other("Custom".into()).forbids_deletion());
    }

    #[test]
    fn tag_lookup_ignores_case() {
        let group = ResourceGroupView::new("rg").with_tag("createdtime", "2025-01-01T00:00:00Z");
        assert_eq!(group.tag("CreatedTime"), Some("2025-01-01T00:00:00Z"));
        assert_eq!(group.tag("Owner"), None);
        assert_eq!(ResourceGroupView::new("untagged").tag("CreatedTime"), None);
    }

    #[test]
    fn credential_mode_parsing() {
        assert_eq!("ambient".parse::<CredentialMode>().unwrap(), CredentialMode::Ambient);
        assert_eq!("Certificate".parse::<CredentialMode>().unwrap(), CredentialMode::Certificate);
        assert!("password".parse::<CredentialMode>().is_err());
    }
}
