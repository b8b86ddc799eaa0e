//! Configuration parsing and validation for rgsweep
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Environment / command-line overrides layered on top of the file
//! - Built-in reserved groups merged with configured ones
//! - Validation with clear error messages

mod reserved;
mod schema;
mod settings;
mod validation;

pub use reserved::*;
pub use schema::*;
pub use settings::*;
pub use validation::*;

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Load, layer and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>, overrides: &ConfigOverrides) -> ConfigResult<CleanupConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    parse_config(&content, overrides)
}

/// Like [`load_config`], but a missing file means "overrides only"
pub fn load_optional_config(
    path: impl AsRef<Path>,
    overrides: &ConfigOverrides,
) -> ConfigResult<CleanupConfig> {
    let path = path.as_ref();
    if path.exists() {
        load_config(path, overrides)
    } else {
        tracing::debug!(path = %path.display(), "No config file, using environment and arguments only");
        resolve_config(RawConfig::default(), overrides)
    }
}

/// Parse, layer and validate configuration from a TOML string
pub fn parse_config(content: &str, overrides: &ConfigOverrides) -> ConfigResult<CleanupConfig> {
    let raw: RawConfig = toml::from_str(content)?;
    resolve_config(raw, overrides)
}

/// Apply overrides to an already-parsed config and validate the result
pub fn resolve_config(mut raw: RawConfig, overrides: &ConfigOverrides) -> ConfigResult<CleanupConfig> {
    // Check version
    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    raw.apply_overrides(overrides);

    // Validate
    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(CleanupConfig::from_raw(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgsweep_api::{CloudInstance, CredentialMode};
    use std::io::Write;

    const AMBIENT_CONFIG: &str = r#"
        config_version = 1

        [azure]
        cloud_instance = "AzureUsGovernment"
        subscription_id = "0f3c2a9e-1111-2222-3333-444455556666"
        credential = "ambient"

        [cleanup]
        ttl_hours = 168
        reserved_groups = ["shared-infra"]
    "#;

    #[test]
    fn parse_minimal_config() {
        let config = parse_config(AMBIENT_CONFIG, &ConfigOverrides::default()).unwrap();
        assert_eq!(config.cloud_instance, CloudInstance::UsGovernment);
        assert_eq!(config.credential_mode, CredentialMode::Ambient);
        assert_eq!(config.ttl_hours, 168);
        assert!(config.reserved.matches_name("shared-infra"));
    }

    #[test]
    fn reject_wrong_version() {
        let config = r#"
            config_version = 99
        "#;

        let result = parse_config(config, &ConfigOverrides::default());
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn unsupported_cloud_instance_is_fatal() {
        let overrides = ConfigOverrides {
            cloud_instance: Some("AzureGermany".into()),
            ..Default::default()
        };
        let result = parse_config(AMBIENT_CONFIG, &overrides);
        assert!(matches!(result, Err(ConfigError::ValidationFailed { .. })));
    }

    #[test]
    fn oversized_ttl_override_is_rejected() {
        let overrides = ConfigOverrides {
            ttl_hours: Some(u32::MAX),
            ..Default::default()
        };
        match parse_config(AMBIENT_CONFIG, &overrides) {
            Err(ConfigError::ValidationFailed { errors }) => {
                assert!(errors.iter().any(|e| matches!(e, ValidationError::TtlTooLarge(_))));
            }
            other => panic!("expected validation failure, got {:?}", other.map(|c| c.ttl_hours)),
        }
    }

    #[test]
    fn overrides_only_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.toml");

        let overrides = ConfigOverrides {
            subscription_id: Some("0f3c2a9e-1111-2222-3333-444455556666".into()),
            ttl_hours: Some(24),
            development: true,
            ..Default::default()
        };

        let config = load_optional_config(&missing, &overrides).unwrap();
        assert_eq!(config.credential_mode, CredentialMode::Ambient);
        assert_eq!(config.ttl_hours, 24);

        assert!(matches!(
            load_config(&missing, &overrides),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(AMBIENT_CONFIG.as_bytes()).unwrap();

        let overrides = ConfigOverrides {
            ttl_hours: Some(12),
            dry_run: true,
            ..Default::default()
        };
        let config = load_config(file.path(), &overrides).unwrap();
        assert_eq!(config.ttl_hours, 12);
        assert!(config.dry_run);
    }
}
