//! Credential provider trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Errors acquiring credentials. Fatal when they happen at startup.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Invalid client certificate: {0}")]
    InvalidCertificate(String),

    #[error("Client certificate bundle has no private key")]
    MissingPrivateKey,

    #[error("Unsupported private key: {0}")]
    UnsupportedKey(String),

    #[error("Failed to sign client assertion: {0}")]
    Signing(String),

    #[error("Token request failed: {0}")]
    TokenRequest(String),

    #[error("Token request rejected ({code}): {description}")]
    TokenRejected { code: String, description: String },

    #[error("Ambient credential unavailable: {0}")]
    AmbientUnavailable(String),
}

pub type CredentialResult<T> = Result<T, CredentialError>;

/// Bearer token for the management API
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    /// Whether the token expires within `margin` of `now`
    pub fn expires_within(&self, margin: chrono::Duration, now: DateTime<Utc>) -> bool {
        self.expires_on - margin <= now
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Source of bearer tokens
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Acquire a token for the given OAuth scope
    async fn get_token(&self, scope: &str) -> CredentialResult<AccessToken>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_margin() {
        let now = Utc::now();
        let token = AccessToken::new("t", now + chrono::Duration::minutes(10));

        assert!(!token.expires_within(chrono::Duration::minutes(5), now));
        assert!(token.expires_within(chrono::Duration::minutes(10), now));
        assert!(token.expires_within(chrono::Duration::minutes(5), now + chrono::Duration::minutes(6)));
    }

    #[test]
    fn debug_hides_token() {
        let token = AccessToken::new("eyJsecret", Utc::now());
        assert!(!format!("{:?}", token).contains("eyJsecret"));
    }
}
