//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};

use crate::CURRENT_CONFIG_VERSION;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Cloud connection settings
    #[serde(default)]
    pub azure: RawAzureConfig,

    /// Cleanup policy settings
    #[serde(default)]
    pub cleanup: RawCleanupConfig,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            config_version: CURRENT_CONFIG_VERSION,
            azure: RawAzureConfig::default(),
            cleanup: RawCleanupConfig::default(),
        }
    }
}

/// Cloud connection settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawAzureConfig {
    /// "AzurePublic" (default), "AzureUsGovernment" or "AzureChina"
    pub cloud_instance: Option<String>,

    pub tenant_id: Option<String>,

    pub subscription_id: Option<String>,

    /// Application (client) id of the service principal
    pub client_id: Option<String>,

    /// Base64-encoded PEM bundle: certificate chain plus private key
    pub client_certificate: Option<String>,

    /// "certificate" (default) or "ambient"
    pub credential: Option<String>,
}

/// Cleanup policy settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawCleanupConfig {
    /// Minimum age in hours before a group may be deleted
    pub ttl_hours: Option<u32>,

    /// Group names that must never be deleted, in addition to the built-in list
    #[serde(default)]
    pub reserved_groups: Vec<String>,

    /// Log decisions without deleting or tagging anything
    #[serde(default)]
    pub dry_run: bool,

    /// Deadline for processing one group (0 or absent = no deadline)
    pub group_timeout_seconds: Option<u64>,
}

/// Settings supplied from the environment or command line.
///
/// Anything set here wins over the file. Reserved groups are merged rather
/// than replaced.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub cloud_instance: Option<String>,
    pub tenant_id: Option<String>,
    pub subscription_id: Option<String>,
    pub client_id: Option<String>,
    pub client_certificate: Option<String>,
    pub credential: Option<String>,
    pub ttl_hours: Option<u32>,
    pub reserved_groups: Vec<String>,
    pub dry_run: bool,
    pub group_timeout_seconds: Option<u64>,
    /// Running in a development environment: default to the ambient credential
    pub development: bool,
}

impl RawConfig {
    /// Layer overrides on top of the values read from the file
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        fn layer(target: &mut Option<String>, value: &Option<String>) {
            if let Some(v) = value {
                *target = Some(v.clone());
            }
        }

        layer(&mut self.azure.cloud_instance, &overrides.cloud_instance);
        layer(&mut self.azure.tenant_id, &overrides.tenant_id);
        layer(&mut self.azure.subscription_id, &overrides.subscription_id);
        layer(&mut self.azure.client_id, &overrides.client_id);
        layer(&mut self.azure.client_certificate, &overrides.client_certificate);
        layer(&mut self.azure.credential, &overrides.credential);

        if self.azure.credential.is_none() && overrides.development {
            self.azure.credential = Some("ambient".to_string());
        }

        if let Some(ttl) = overrides.ttl_hours {
            self.cleanup.ttl_hours = Some(ttl);
        }
        for name in &overrides.reserved_groups {
            if !self.cleanup.reserved_groups.contains(name) {
                self.cleanup.reserved_groups.push(name.clone());
            }
        }
        if overrides.dry_run {
            self.cleanup.dry_run = true;
        }
        if let Some(secs) = overrides.group_timeout_seconds {
            self.cleanup.group_timeout_seconds = Some(secs);
        }
    }
}
