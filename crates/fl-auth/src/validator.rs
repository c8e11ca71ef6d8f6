//! Credential validation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use fl_core::config::{DigestAlgorithm, DigestConfig};
use tracing::debug;

use crate::digest::DigestCredentials;
use crate::error::AuthResult;

/// Checks digest credentials against an identity store.
///
/// The nonce has already been checked when this runs; implementations only
/// decide whether `response` proves knowledge of the user's secret.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    /// Returns true if the credentials are accepted for `method`.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity store cannot be consulted.
    async fn validate(&self, credentials: &DigestCredentials, method: &str) -> AuthResult<bool>;
}

/// Validates digest responses against a password table.
///
/// Responses must use the validator's algorithm, which is the one the
/// challenge advertised. Credentials that omit `algorithm` are held to it too.
#[derive(Debug, Clone, Default)]
pub struct PasswordDigestValidator {
    users: BTreeMap<String, String>,
    algorithm: DigestAlgorithm,
}

impl PasswordDigestValidator {
    /// Creates a validator over `username -> password` pairs.
    #[must_use]
    pub const fn new(users: BTreeMap<String, String>, algorithm: DigestAlgorithm) -> Self {
        Self { users, algorithm }
    }

    /// Creates a validator for the `[digest]` section.
    #[must_use]
    pub fn from_config(config: &DigestConfig) -> Self {
        Self::new(config.users.clone(), config.algorithm)
    }

    /// Returns the algorithm responses are checked with.
    #[must_use]
    pub const fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Computes the expected `response` for `credentials` and `password`.
    #[must_use]
    pub fn expected_response(
        algorithm: DigestAlgorithm,
        credentials: &DigestCredentials,
        password: &str,
        method: &str,
    ) -> String {
        let hash = |input: String| {
            let digest = match algorithm {
                DigestAlgorithm::Md5 => fl_crypto::md5(input.as_bytes()),
                DigestAlgorithm::Sha256 => fl_crypto::sha256(input.as_bytes()),
            };
            fl_crypto::to_hex(&digest)
        };

        let ha1 = hash(format!("{}:{}:{password}", credentials.username, credentials.realm));
        let ha2 = hash(format!("{method}:{}", credentials.uri));

        match (&credentials.qop, &credentials.nc, &credentials.cnonce) {
            (Some(qop), Some(nc), Some(cnonce)) => hash(format!(
                "{ha1}:{}:{nc}:{cnonce}:{qop}:{ha2}",
                credentials.nonce
            )),
            _ => hash(format!("{ha1}:{}:{ha2}", credentials.nonce)),
        }
    }
}

#[async_trait]
impl CredentialValidator for PasswordDigestValidator {
    async fn validate(&self, credentials: &DigestCredentials, method: &str) -> AuthResult<bool> {
        if let Some(declared) = credentials.algorithm.as_deref() {
            if declared.parse::<DigestAlgorithm>().ok() != Some(self.algorithm) {
                debug!(
                    username = %credentials.username,
                    declared,
                    expected = %self.algorithm,
                    "digest algorithm mismatch"
                );
                return Ok(false);
            }
        }

        let Some(password) = self.users.get(&credentials.username) else {
            return Ok(false);
        };

        let expected = Self::expected_response(self.algorithm, credentials, password, method);
        Ok(fl_crypto::constant_time_eq(
            expected.as_bytes(),
            credentials.response.to_ascii_lowercase().as_bytes(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(response: &str, algorithm: Option<&str>) -> DigestCredentials {
        DigestCredentials {
            username: "svc".to_string(),
            realm: "ferrolink".to_string(),
            nonce: "bm9uY2U=".to_string(),
            uri: "/sts/issue".to_string(),
            qop: Some("auth".to_string()),
            nc: Some("00000001".to_string()),
            cnonce: Some("abc".to_string()),
            response: response.to_string(),
            opaque: None,
            algorithm: algorithm.map(str::to_string),
        }
    }

    fn validator(algorithm: DigestAlgorithm) -> PasswordDigestValidator {
        PasswordDigestValidator::new(
            BTreeMap::from([("svc".to_string(), "secret".to_string())]),
            algorithm,
        )
    }

    #[test]
    fn md5_matches_rfc_2617_example() {
        let credentials = DigestCredentials {
            username: "Mufasa".to_string(),
            realm: "testrealm@host.com".to_string(),
            nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093".to_string(),
            uri: "/dir/index.html".to_string(),
            qop: Some("auth".to_string()),
            nc: Some("00000001".to_string()),
            cnonce: Some("0a4f113b".to_string()),
            response: String::new(),
            opaque: None,
            algorithm: None,
        };
        assert_eq!(
            PasswordDigestValidator::expected_response(
                DigestAlgorithm::Md5,
                &credentials,
                "Circle Of Life",
                "GET"
            ),
            "6629fae49393a05397450978507c4ef1"
        );
    }

    #[tokio::test]
    async fn accepts_correct_response() {
        for (algorithm, len) in [(DigestAlgorithm::Md5, 32), (DigestAlgorithm::Sha256, 64)] {
            let expected = PasswordDigestValidator::expected_response(
                algorithm,
                &credentials("", None),
                "secret",
                "POST",
            );
            assert_eq!(expected.len(), len);

            let declared = credentials(&expected, Some(algorithm.as_str()));
            assert!(validator(algorithm).validate(&declared, "POST").await.unwrap());
            assert!(!validator(algorithm).validate(&declared, "GET").await.unwrap());

            let undeclared = credentials(&expected, None);
            assert!(validator(algorithm).validate(&undeclared, "POST").await.unwrap());
        }
    }

    #[tokio::test]
    async fn rejects_wrong_password_unknown_user_and_other_algorithm() {
        let md5 = validator(DigestAlgorithm::Md5);
        let wrong = PasswordDigestValidator::expected_response(
            DigestAlgorithm::Md5,
            &credentials("", None),
            "guess",
            "POST",
        );
        assert!(!md5.validate(&credentials(&wrong, Some("MD5")), "POST").await.unwrap());

        let mut stranger = credentials("00", Some("MD5"));
        stranger.username = "mallory".to_string();
        assert!(!md5.validate(&stranger, "POST").await.unwrap());

        let sha = PasswordDigestValidator::expected_response(
            DigestAlgorithm::Sha256,
            &credentials("", None),
            "secret",
            "POST",
        );
        assert!(!md5.validate(&credentials(&sha, Some("SHA-256")), "POST").await.unwrap());
        assert!(!md5.validate(&credentials(&sha, Some("MD5-sess")), "POST").await.unwrap());
    }
}
