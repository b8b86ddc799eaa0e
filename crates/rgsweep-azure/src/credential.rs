//! Credential providers

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use rgsweep_api::CredentialMode;
use rgsweep_cloud_api::{AccessToken, CredentialError, CredentialResult, TokenCredential};
use rgsweep_config::CleanupConfig;
use rgsweep_util::{error_chain, mask_after, system_now};
use serde::Deserialize;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{AzureEndpoints, ClientCertificate};

const JWT_BEARER_ASSERTION: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Timeout for token endpoint requests
const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Select the credential provider for the configured mode
pub fn select_credential(config: &CleanupConfig) -> CredentialResult<Box<dyn TokenCredential>> {
    let endpoints = AzureEndpoints::for_instance(config.cloud_instance);

    match config.credential_mode {
        CredentialMode::Ambient => {
            let tenant = Some(config.tenant_id.clone()).filter(|t| !t.is_empty());
            Ok(Box::new(AzureCliCredential::new(tenant)))
        }
        CredentialMode::Certificate => {
            let blob = config.client_certificate.as_deref().ok_or_else(|| {
                CredentialError::InvalidCertificate("no client certificate configured".into())
            })?;
            let certificate = ClientCertificate::from_base64(blob)?;
            Ok(Box::new(ClientCertificateCredential::new(
                config.tenant_id.clone(),
                config.client_id.clone(),
                certificate,
                endpoints,
            )?))
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

/// Service principal authenticated by a signed client assertion
pub struct ClientCertificateCredential {
    tenant_id: String,
    client_id: String,
    certificate: ClientCertificate,
    endpoints: AzureEndpoints,
    http: reqwest::Client,
}

impl ClientCertificateCredential {
    pub fn new(
        tenant_id: String,
        client_id: String,
        certificate: ClientCertificate,
        endpoints: AzureEndpoints,
    ) -> CredentialResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CredentialError::TokenRequest(error_chain(&e)))?;

        info!(
            thumbprint = %mask_after(&certificate.thumbprint_hex(), 8),
            chain_len = certificate.chain_len(),
            authority = endpoints.authority,
            "Using client certificate credential"
        );

        Ok(Self {
            tenant_id,
            client_id,
            certificate,
            endpoints,
            http,
        })
    }
}

#[async_trait]
impl TokenCredential for ClientCertificateCredential {
    fn name(&self) -> &'static str {
        "client-certificate"
    }

    async fn get_token(&self, scope: &str) -> CredentialResult<AccessToken> {
        let token_url = self.endpoints.token_url(&self.tenant_id);
        let now = system_now();
        let assertion = self
            .certificate
            .client_assertion(&self.client_id, &token_url, now)?;

        let form = [
            ("client_id", self.client_id.as_str()),
            ("scope", scope),
            ("client_assertion_type", JWT_BEARER_ASSERTION),
            ("client_assertion", assertion.as_str()),
            ("grant_type", "client_credentials"),
        ];

        debug!(scope, "Requesting token with client assertion");
        let response = self
            .http
            .post(&token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| CredentialError::TokenRequest(error_chain(&e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CredentialError::TokenRequest(error_chain(&e)))?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => CredentialError::TokenRejected {
                    code: err.error,
                    description: err.error_description,
                },
                Err(_) => CredentialError::TokenRequest(format!("HTTP {}: {}", status, body)),
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| CredentialError::TokenRequest(format!("malformed token response: {}", e)))?;

        Ok(AccessToken::new(
            token.access_token,
            now + chrono::Duration::seconds(token.expires_in as i64),
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    /// Local time, e.g. `2024-05-01 13:45:10.000000`
    expires_on: Option<String>,
    /// Epoch seconds (newer CLI versions)
    #[serde(rename = "expires_on")]
    expires_on_epoch: Option<i64>,
}

/// Developer credential borrowed from a logged-in Azure CLI
#[derive(Debug, Clone, Default)]
pub struct AzureCliCredential {
    tenant_id: Option<String>,
}

impl AzureCliCredential {
    pub fn new(tenant_id: Option<String>) -> Self {
        info!("Using Azure CLI credential");
        Self { tenant_id }
    }

    fn parse_output(stdout: &[u8]) -> CredentialResult<AccessToken> {
        let token: CliToken = serde_json::from_slice(stdout).map_err(|e| {
            CredentialError::AmbientUnavailable(format!("unexpected az output: {}", e))
        })?;

        let expires_on = token
            .expires_on_epoch
            .and_then(|epoch| DateTime::<Utc>::from_timestamp(epoch, 0))
            .or_else(|| token.expires_on.as_deref().and_then(parse_cli_local_time))
            .ok_or_else(|| {
                CredentialError::AmbientUnavailable("az output has no token expiry".into())
            })?;

        Ok(AccessToken::new(token.access_token, expires_on))
    }
}

fn parse_cli_local_time(value: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    fn name(&self) -> &'static str {
        "azure-cli"
    }

    async fn get_token(&self, scope: &str) -> CredentialResult<AccessToken> {
        let mut cmd = Command::new("az");
        cmd.args(["account", "get-access-token", "--output", "json", "--scope", scope]);
        if let Some(tenant) = &self.tenant_id {
            cmd.args(["--tenant", tenant]);
        }

        debug!(scope, "Requesting token from Azure CLI");
        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CredentialError::AmbientUnavailable("Azure CLI (az) not found on PATH".into())
            } else {
                CredentialError::AmbientUnavailable(format!("failed to run az: {}", e))
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CredentialError::AmbientUnavailable(stderr.trim().to_string()));
        }

        Self::parse_output(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgsweep_config::{ConfigOverrides, RawConfig, resolve_config};

    #[test]
    fn parse_cli_epoch_output() {
        let out = br#"{
            "accessToken": "eyJ0eXAi",
            "expiresOn": "2024-05-01 13:45:10.000000",
            "expires_on": 1714571110,
            "subscription": "0f3c2a9e-1111-2222-3333-444455556666",
            "tenant": "72f988bf-0000-0000-0000-000000000000",
            "tokenType": "Bearer"
        }"#;
        let token = AzureCliCredential::parse_output(out).unwrap();
        assert_eq!(token.token, "eyJ0eXAi");
        assert_eq!(token.expires_on.timestamp(), 1714571110);
    }

    #[test]
    fn parse_cli_local_time_output() {
        let out = br#"{"accessToken": "abc", "expiresOn": "2024-05-01 13:45:10.123456"}"#;
        let token = AzureCliCredential::parse_output(out).unwrap();
        assert_eq!(token.token, "abc");

        let out = br#"{"accessToken": "abc"}"#;
        assert!(matches!(
            AzureCliCredential::parse_output(out),
            Err(CredentialError::AmbientUnavailable(_))
        ));
    }

    #[test]
    fn select_ambient_credential() {
        let overrides = ConfigOverrides {
            subscription_id: Some("0f3c2a9e-1111-2222-3333-444455556666".into()),
            ttl_hours: Some(24),
            credential: Some("ambient".into()),
            ..Default::default()
        };
        let config = resolve_config(RawConfig::default(), &overrides).unwrap();
        let credential = select_credential(&config).unwrap();
        assert_eq!(credential.name(), "azure-cli");
    }

    #[test]
    fn select_certificate_credential() {
        use base64::Engine;
        let bundle = include_str!("../testdata/client-pkcs8.pem");
        let overrides = ConfigOverrides {
            tenant_id: Some("72f988bf-0000-0000-0000-000000000000".into()),
            subscription_id: Some("0f3c2a9e-1111-2222-3333-444455556666".into()),
            client_id: Some("11111111-2222-3333-4444-555555555555".into()),
            client_certificate: Some(base64::engine::general_purpose::STANDARD.encode(bundle)),
            ttl_hours: Some(24),
            ..Default::default()
        };
        let config = resolve_config(RawConfig::default(), &overrides).unwrap();
        let credential = select_credential(&config).unwrap();
        assert_eq!(credential.name(), "client-certificate");
    }

    #[test]
    fn certificate_without_key_is_fatal() {
        use base64::Engine;
        let bundle = include_str!("../testdata/cert-only.pem");
        let overrides = ConfigOverrides {
            tenant_id: Some("72f988bf-0000-0000-0000-000000000000".into()),
            subscription_id: Some("0f3c2a9e-1111-2222-3333-444455556666".into()),
            client_id: Some("11111111-2222-3333-4444-555555555555".into()),
            client_certificate: Some(base64::engine::general_purpose::STANDARD.encode(bundle)),
            ttl_hours: Some(24),
            ..Default::default()
        };
        let config = resolve_config(RawConfig::default(), &overrides).unwrap();
        assert!(matches!(
            select_credential(&config),
            Err(CredentialError::MissingPrivateKey)
        ));
    }
}
