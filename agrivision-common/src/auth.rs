//! Credential verification
//!
//! The controller only ever talks to [`CredentialVerifier`]; swapping the
//! static check for a real identity provider does not touch UI code.
//!
//! # Static verifier
//!
//! - Password is never stored, only its SHA-256 digest (64 hex chars)
//! - Digest comparison is constant-time
//! - Default pair is `admin` / `admin`

use crate::error::{Error, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
}

/// Pluggable login check
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// `Ok(identity)` on success, [`Error::Unauthorized`] on mismatch
    async fn verify(&self, username: &str, password: &str) -> Result<Identity>;
}

/// Single configured username/password pair
#[derive(Debug, Clone)]
pub struct StaticCredentialVerifier {
    username: String,
    password_sha256: String,
}

impl StaticCredentialVerifier {
    /// Build from a username and an already hashed password
    pub fn new(username: impl Into<String>, password_sha256: impl Into<String>) -> Result<Self> {
        let password_sha256 = password_sha256.into().trim().to_ascii_lowercase();
        if password_sha256.len() != 64 || !password_sha256.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::Config(
                "password_sha256 must be 64 hex characters".to_string(),
            ));
        }
        Ok(Self {
            username: username.into(),
            password_sha256,
        })
    }

    /// Build from a plaintext password (tests, defaults)
    pub fn from_plaintext(username: impl Into<String>, password: &str) -> Self {
        Self {
            username: username.into(),
            password_sha256: hash_password(password),
        }
    }
}

impl Default for StaticCredentialVerifier {
    fn default() -> Self {
        Self::from_plaintext("admin", "admin")
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentialVerifier {
    async fn verify(&self, username: &str, password: &str) -> Result<Identity> {
        let supplied = hash_password(password);
        let digest_ok: bool = supplied
            .as_bytes()
            .ct_eq(self.password_sha256.as_bytes())
            .into();

        if username == self.username && digest_ok {
            debug!(username, "Credentials accepted");
            Ok(Identity {
                username: username.to_string(),
            })
        } else {
            warn!(username, "Credentials rejected");
            Err(Error::Unauthorized)
        }
    }
}

/// SHA-256 of `password` as 64 lowercase hex characters
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_64_hex_chars() {
        let h = hash_password("admin");
        assert_eq!(h.len(), 64);
        assert_eq!(
            h,
            "8c6976e5b5410415bde908bd4dee15dfb167a9c873fc4bb8a81f6f2ab448a918"
        );
    }

    #[tokio::test]
    async fn default_pair_is_accepted() {
        let v = StaticCredentialVerifier::default();
        let id = v.verify("admin", "admin").await.unwrap();
        assert_eq!(id.username, "admin");
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let v = StaticCredentialVerifier::default();
        assert!(matches!(v.verify("admin", "nope").await, Err(Error::Unauthorized)));
    }

    #[tokio::test]
    async fn wrong_username_is_rejected() {
        let v = StaticCredentialVerifier::default();
        assert!(v.verify("root", "admin").await.is_err());
    }

    #[tokio::test]
    async fn prehashed_digest_accepts_uppercase() {
        let digest = hash_password("s3cret").to_uppercase();
        let v = StaticCredentialVerifier::new("grower", digest).unwrap();
        assert!(v.verify("grower", "s3cret").await.is_ok());
    }

    #[test]
    fn malformed_digest_is_a_config_error() {
        assert!(matches!(
            StaticCredentialVerifier::new("x", "abc"),
            Err(Error::Config(_))
        ));
    }
}
