//! Client certificate parsing and client assertion signing

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use rgsweep_cloud_api::{CredentialError, CredentialResult};
use ring::rand::SystemRandom;
use ring::signature::{self, RsaKeyPair};
use rustls_pemfile::Item;
use serde::Serialize;
use std::fmt;

/// How long a signed client assertion stays valid
const ASSERTION_LIFETIME_MINUTES: i64 = 10;

/// X.509 certificate chain plus the leaf's RSA private key
pub struct ClientCertificate {
    /// DER certificates, leaf first
    chain: Vec<Vec<u8>>,
    key_pair: RsaKeyPair,
    /// SHA-1 of the leaf certificate
    thumbprint: Vec<u8>,
}

#[derive(Serialize)]
struct AssertionHeader {
    alg: &'static str,
    typ: &'static str,
    x5t: String,
    x5c: Vec<String>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    aud: &'a str,
    iss: &'a str,
    sub: &'a str,
    jti: String,
    nbf: i64,
    exp: i64,
}

impl ClientCertificate {
    /// Parse a base64-encoded PEM bundle as stored in configuration
    pub fn from_base64(blob: &str) -> CredentialResult<Self> {
        let pem = rgsweep_config::decode_certificate_blob(blob)
            .map_err(CredentialError::InvalidCertificate)?;
        Self::from_pem(&pem)
    }

    /// Parse a PEM bundle holding certificates and one RSA private key
    pub fn from_pem(pem: &[u8]) -> CredentialResult<Self> {
        let mut chain = Vec::new();
        let mut key_pair = None;

        let mut reader = pem;
        for item in rustls_pemfile::read_all(&mut reader) {
            let item = item.map_err(|e| CredentialError::InvalidCertificate(e.to_string()))?;
            match item {
                Item::X509Certificate(cert) => chain.push(cert.as_ref().to_vec()),
                Item::Pkcs8Key(key) if key_pair.is_none() => {
                    let parsed = RsaKeyPair::from_pkcs8(key.secret_pkcs8_der())
                        .map_err(|e| CredentialError::UnsupportedKey(e.to_string()))?;
                    key_pair = Some(parsed);
                }
                Item::Pkcs1Key(key) if key_pair.is_none() => {
                    let parsed = RsaKeyPair::from_der(key.secret_pkcs1_der())
                        .map_err(|e| CredentialError::UnsupportedKey(e.to_string()))?;
                    key_pair = Some(parsed);
                }
                Item::Sec1Key(_) => {
                    return Err(CredentialError::UnsupportedKey(
                        "EC keys are not supported, use an RSA certificate".into(),
                    ));
                }
                _ => {}
            }
        }

        let key_pair = key_pair.ok_or(CredentialError::MissingPrivateKey)?;
        let leaf = chain
            .first()
            .ok_or_else(|| CredentialError::InvalidCertificate("no certificate in bundle".into()))?;
        let thumbprint = ring::digest::digest(&ring::digest::SHA1_FOR_LEGACY_USE_ONLY, leaf)
            .as_ref()
            .to_vec();

        Ok(Self {
            chain,
            key_pair,
            thumbprint,
        })
    }

    /// Uppercase hex SHA-1 thumbprint, as shown by the portal
    pub fn thumbprint_hex(&self) -> String {
        hex::encode_upper(&self.thumbprint)
    }

    /// Number of certificates in the chain
    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }

    /// Build a signed RS256 client assertion for the token endpoint
    pub fn client_assertion(
        &self,
        client_id: &str,
        token_url: &str,
        now: DateTime<Utc>,
    ) -> CredentialResult<String> {
        let header = AssertionHeader {
            alg: "RS256",
            typ: "JWT",
            x5t: URL_SAFE_NO_PAD.encode(&self.thumbprint),
            x5c: self.chain.iter().map(|der| STANDARD.encode(der)).collect(),
        };
        let claims = AssertionClaims {
            aud: token_url,
            iss: client_id,
            sub: client_id,
            jti: uuid::Uuid::new_v4().to_string(),
            nbf: now.timestamp(),
            exp: (now + chrono::Duration::minutes(ASSERTION_LIFETIME_MINUTES)).timestamp(),
        };

        let header = serde_json::to_vec(&header).map_err(|e| CredentialError::Signing(e.to_string()))?;
        let claims = serde_json::to_vec(&claims).map_err(|e| CredentialError::Signing(e.to_string()))?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims)
        );

        let rng = SystemRandom::new();
        let mut sig = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(&signature::RSA_PKCS1_SHA256, &rng, signing_input.as_bytes(), &mut sig)
            .map_err(|_| CredentialError::Signing("RSA signing failed".into()))?;

        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(sig)))
    }
}

impl fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("thumbprint", &self.thumbprint_hex())
            .field("chain_len", &self.chain.len())
            .finish_non_exhaustive()
    }
}
