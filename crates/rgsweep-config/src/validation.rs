//! Configuration validation

use crate::schema::RawConfig;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rgsweep_api::{CloudInstance, CredentialMode};
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("Unsupported cloud instance '{0}' (expected AzurePublic, AzureUsGovernment or AzureChina)")]
    UnsupportedCloudInstance(String),

    #[error("Unknown credential mode '{0}' (expected certificate or ambient)")]
    UnknownCredentialMode(String),

    #[error("Subscription id '{0}' is not a GUID")]
    InvalidSubscriptionId(String),

    #[error("ttl_hours must be a positive number of hours")]
    InvalidTtl,

    #[error("ttl_hours must not exceed {max} (got {0})", max = MAX_TTL_HOURS)]
    TtlTooLarge(u32),

    #[error("Malformed client certificate: {0}")]
    MalformedCertificate(String),

    #[error("Reserved group names cannot be empty")]
    EmptyReservedName,
}

/// Largest accepted TTL: one hundred years
pub const MAX_TTL_HOURS: u32 = 100 * 365 * 24;

/// Validate a raw configuration, collecting every problem found
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let azure = &config.azure;

    if let Some(instance) = &azure.cloud_instance
        && instance.parse::<CloudInstance>().is_err()
    {
        errors.push(ValidationError::UnsupportedCloudInstance(instance.clone()));
    }

    match non_empty(&azure.subscription_id) {
        None => errors.push(ValidationError::MissingSetting("azure.subscription_id")),
        Some(id) => {
            if uuid::Uuid::parse_str(id).is_err() {
                errors.push(ValidationError::InvalidSubscriptionId(id.to_string()));
            }
        }
    }

    let mode = match parse_credential_mode(config) {
        Ok(mode) => Some(mode),
        Err(e) => {
            errors.push(e);
            None
        }
    };

    if mode == Some(CredentialMode::Certificate) {
        if non_empty(&azure.tenant_id).is_none() {
            errors.push(ValidationError::MissingSetting("azure.tenant_id"));
        }
        if non_empty(&azure.client_id).is_none() {
            errors.push(ValidationError::MissingSetting("azure.client_id"));
        }
        match non_empty(&azure.client_certificate) {
            None => errors.push(ValidationError::MissingSetting("azure.client_certificate")),
            Some(blob) => {
                if let Err(e) = decode_certificate_blob(blob) {
                    errors.push(ValidationError::MalformedCertificate(e));
                }
            }
        }
    }

    match config.cleanup.ttl_hours {
        None => errors.push(ValidationError::MissingSetting("cleanup.ttl_hours")),
        Some(0) => errors.push(ValidationError::InvalidTtl),
        Some(hours) if hours > MAX_TTL_HOURS => errors.push(ValidationError::TtlTooLarge(hours)),
        Some(_) => {}
    }

    if config
        .cleanup
        .reserved_groups
        .iter()
        .any(|name| name.trim().is_empty())
    {
        errors.push(ValidationError::EmptyReservedName);
    }

    errors
}

/// Resolve the credential mode, defaulting to certificate
pub fn parse_credential_mode(config: &RawConfig) -> Result<CredentialMode, ValidationError> {
    match non_empty(&config.azure.credential) {
        None => Ok(CredentialMode::Certificate),
        Some(mode) => mode
            .parse()
            .map_err(|_| ValidationError::UnknownCredentialMode(mode.to_string())),
    }
}

/// Decode the base64 certificate blob. Whitespace (line wrapping) is ignored.
pub fn decode_certificate_blob(blob: &str) -> Result<Vec<u8>, String> {
    let compact: String = blob.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| format!("not valid base64: {}", e))?;
    if bytes.is_empty() {
        return Err("decoded certificate is empty".into());
    }
    Ok(bytes)
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawAzureConfig, RawCleanupConfig};

    fn valid_certificate_config() -> RawConfig {
        RawConfig {
            config_version: 1,
            azure: RawAzureConfig {
                cloud_instance: Some("AzurePublic".into()),
                tenant_id: Some("tenant".into()),
                subscription_id: Some("0f3c2a9e-1111-2222-3333-444455556666".into()),
                client_id: Some("client".into()),
                client_certificate: Some(STANDARD.encode("-----BEGIN CERTIFICATE-----")),
                credential: None,
            },
            cleanup: RawCleanupConfig {
                ttl_hours: Some(168),
                reserved_groups: vec!["shared".into()],
                dry_run: false,
                group_timeout_seconds: None,
            },
        }
    }

    #[test]
    fn accepts_valid_config() {
        let errors = validate_config(&valid_certificate_config());
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn rejects_unsupported_cloud_instance() {
        let mut config = valid_certificate_config();
        config.azure.cloud_instance = Some("AzureGermany".into());
        let errors = validate_config(&config);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::UnsupportedCloudInstance(name) if name == "AzureGermany")));
    }

    #[test]
    fn certificate_mode_requires_identity_and_certificate() {
        let mut config = valid_certificate_config();
        config.azure.tenant_id = None;
        config.azure.client_id = Some("  ".into());
        config.azure.client_certificate = None;

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 3, "got {:?}", errors);
    }

    #[test]
    fn ambient_mode_needs_only_subscription() {
        let mut config = valid_certificate_config();
        config.azure.credential = Some("ambient".into());
        config.azure.tenant_id = None;
        config.azure.client_id = None;
        config.azure.client_certificate = None;

        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn rejects_malformed_certificate() {
        let mut config = valid_certificate_config();
        config.azure.client_certificate = Some("%%% not base64 %%%".into());
        let errors = validate_config(&config);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::MalformedCertificate(_))));
    }

    #[test]
    fn rejects_bad_subscription_and_ttl() {
        let mut config = valid_certificate_config();
        config.azure.subscription_id = Some("my-subscription".into());
        config.cleanup.ttl_hours = Some(0);

        let errors = validate_config(&config);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidSubscriptionId(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidTtl)));
    }

    #[test]
    fn ttl_upper_bound() {
        let mut config = valid_certificate_config();
        config.cleanup.ttl_hours = Some(MAX_TTL_HOURS);
        assert!(validate_config(&config).is_empty());

        config.cleanup.ttl_hours = Some(u32::MAX);
        let errors = validate_config(&config);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::TtlTooLarge(hours) if *hours == u32::MAX)));
    }

    #[test]
    fn missing_ttl_is_an_error() {
        let mut config = valid_certificate_config();
        config.cleanup.ttl_hours = None;
        let errors = validate_config(&config);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::MissingSetting("cleanup.ttl_hours"))));
    }

    #[test]
    fn certificate_blob_tolerates_line_wrapping() {
        let encoded = STANDARD.encode(b"certificate bytes that wrap");
        let (a, b) = encoded.split_at(10);
        let wrapped = format!("{}\n  {}\n", a, b);
        assert_eq!(
            decode_certificate_blob(&wrapped).unwrap(),
            b"certificate bytes that wrap".to_vec()
        );
    }
}
