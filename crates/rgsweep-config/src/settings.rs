//! Validated settings

use crate::reserved::ReservedGroups;
use crate::schema::RawConfig;
use crate::validation::{non_empty, parse_credential_mode};
use rgsweep_api::{CloudInstance, CredentialMode};
use rgsweep_util::mask_identifier;
use std::fmt;
use std::time::Duration;

/// Validated configuration, immutable for the lifetime of the process
#[derive(Clone)]
pub struct CleanupConfig {
    pub tenant_id: String,
    pub subscription_id: String,
    pub client_id: String,
    /// Base64-encoded PEM bundle; only required for certificate credentials
    pub client_certificate: Option<String>,
    pub cloud_instance: CloudInstance,
    pub credential_mode: CredentialMode,
    pub ttl_hours: u32,
    pub reserved: ReservedGroups,
    pub dry_run: bool,
    /// Per-group processing deadline. None means no deadline.
    pub group_timeout: Option<Duration>,
}

impl CleanupConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let cloud_instance = raw
            .azure
            .cloud_instance
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or(CloudInstance::Public);
        let credential_mode = parse_credential_mode(&raw).unwrap_or(CredentialMode::Certificate);
        let client_certificate = non_empty(&raw.azure.client_certificate).map(str::to_string);

        Self {
            tenant_id: owned(&raw.azure.tenant_id),
            subscription_id: owned(&raw.azure.subscription_id),
            client_id: owned(&raw.azure.client_id),
            client_certificate,
            cloud_instance,
            credential_mode,
            ttl_hours: raw.cleanup.ttl_hours.unwrap_or(0),
            reserved: ReservedGroups::with_names(raw.cleanup.reserved_groups),
            dry_run: raw.cleanup.dry_run,
            // 0 means no deadline
            group_timeout: raw
                .cleanup
                .group_timeout_seconds
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }

    /// Settings in a form safe to print: identifiers masked, certificate omitted
    pub fn masked_summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("CloudInstance", self.cloud_instance.to_string()),
            ("Credential", self.credential_mode.to_string()),
            ("TenantId", mask_identifier(&self.tenant_id)),
            ("SubscriptionId", mask_identifier(&self.subscription_id)),
            ("ClientId", mask_identifier(&self.client_id)),
            ("TTLHours", self.ttl_hours.to_string()),
            ("ReservedGroups", self.reserved.names().len().to_string()),
            ("DryRun", self.dry_run.to_string()),
            (
                "GroupTimeout",
                self.group_timeout
                    .map(|d| format!("{}s", d.as_secs()))
                    .unwrap_or_else(|| "none".to_string()),
            ),
        ]
    }
}

impl fmt::Debug for CleanupConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupConfig")
            .field("tenant_id", &self.tenant_id)
            .field("subscription_id", &self.subscription_id)
            .field("client_id", &self.client_id)
            .field(
                "client_certificate",
                &self.client_certificate.as_ref().map(|_| "<redacted>"),
            )
            .field("cloud_instance", &self.cloud_instance)
            .field("credential_mode", &self.credential_mode)
            .field("ttl_hours", &self.ttl_hours)
            .field("reserved", &self.reserved)
            .field("dry_run", &self.dry_run)
            .field("group_timeout", &self.group_timeout)
            .finish()
    }
}

fn owned(value: &Option<String>) -> String {
    non_empty(value).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ConfigOverrides;

    fn raw(toml_str: &str) -> RawConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn defaults_applied() {
        let config = CleanupConfig::from_raw(raw(
            r#"
            config_version = 1
            [azure]
            subscription_id = "0f3c2a9e-1111-2222-3333-444455556666"
            credential = "ambient"
            [cleanup]
            ttl_hours = 72
        "#,
        ));

        assert_eq!(config.cloud_instance, CloudInstance::Public);
        assert_eq!(config.credential_mode, CredentialMode::Ambient);
        assert_eq!(config.ttl_hours, 72);
        assert!(config.client_certificate.is_none());
        assert!(config.group_timeout.is_none());
        assert!(config.reserved.matches_name("NetworkWatcherRG"));
    }

    #[test]
    fn zero_timeout_means_none() {
        let mut r = RawConfig::default();
        r.cleanup.group_timeout_seconds = Some(0);
        assert!(CleanupConfig::from_raw(r).group_timeout.is_none());

        let mut r = RawConfig::default();
        r.apply_overrides(&ConfigOverrides {
            group_timeout_seconds: Some(30),
            ..Default::default()
        });
        assert_eq!(
            CleanupConfig::from_raw(r).group_timeout,
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn debug_redacts_certificate() {
        let mut r = RawConfig::default();
        r.azure.client_certificate = Some("c2VjcmV0LWtleS1tYXRlcmlhbA==".into());
        let config = CleanupConfig::from_raw(r);

        let debug = format!("{:?}", config);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("c2VjcmV0"));
    }

    #[test]
    fn masked_summary_hides_identifiers() {
        let mut r = RawConfig::default();
        r.azure.subscription_id = Some("0f3c2a9e-1111-2222-3333-444455556666".into());
        let config = CleanupConfig::from_raw(r);

        let summary = config.masked_summary();
        let (_, subscription) = summary
            .iter()
            .find(|(key, _)| *key == "SubscriptionId")
            .unwrap();
        assert!(subscription.starts_with("0f3c"));
        assert!(!subscription.contains("2222"));
    }
}
