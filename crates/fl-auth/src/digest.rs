//! HTTP digest challenges and credentials.

use std::fmt;
use std::sync::Arc;

use fl_core::config::{DigestAlgorithm, DigestConfig};
use tracing::{debug, info, instrument};

use crate::error::{AuthError, AuthResult};
use crate::nonce::{NonceGuard, NonceStatus};
use crate::validator::CredentialValidator;

/// A `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    /// Protection realm.
    pub realm: String,
    /// Protection domain.
    pub domain: String,
    /// Freshly issued nonce.
    pub nonce: String,
    /// Digest algorithm.
    pub algorithm: String,
    /// Whether the previous nonce was rejected only for its age.
    pub stale: bool,
}

impl fmt::Display for DigestChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"Digest realm="{}",domain="{}",nonce="{}",algorithm={},qop=auth,stale="{}""#,
            self.realm, self.domain, self.nonce, self.algorithm, self.stale
        )
    }
}

/// Parsed `Authorization: Digest ...` credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestCredentials {
    /// User name.
    pub username: String,
    /// Realm the client answered for.
    pub realm: String,
    /// Nonce the client answered.
    pub nonce: String,
    /// Request URI covered by the response.
    pub uri: String,
    /// Quality of protection.
    pub qop: Option<String>,
    /// Nonce count.
    pub nc: Option<String>,
    /// Client nonce.
    pub cnonce: Option<String>,
    /// Hex digest proving knowledge of the secret.
    pub response: String,
    /// Opaque value echoed back.
    pub opaque: Option<String>,
    /// Algorithm the client used.
    pub algorithm: Option<String>,
}

impl DigestCredentials {
    /// Parses the value of an `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedCredentials`] if the scheme is not
    /// `Digest` or a required field is missing.
    pub fn parse(header: &str) -> AuthResult<Self> {
        let header = header.trim();
        let params = match header.split_once(char::is_whitespace) {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("digest") => rest,
            _ => {
                return Err(AuthError::MalformedCredentials(
                    "not a Digest authorization".to_string(),
                ))
            }
        };

        let mut username = None;
        let mut realm = None;
        let mut nonce = None;
        let mut uri = None;
        let mut qop = None;
        let mut nc = None;
        let mut cnonce = None;
        let mut response = None;
        let mut opaque = None;
        let mut algorithm = None;

        for part in split_params(params) {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let value = unquote(value.trim());
            match key.trim().to_ascii_lowercase().as_str() {
                "username" => username = Some(value),
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "uri" => uri = Some(value),
                "qop" => qop = Some(value),
                "nc" => nc = Some(value),
                "cnonce" => cnonce = Some(value),
                "response" => response = Some(value),
                "opaque" => opaque = Some(value),
                "algorithm" => algorithm = Some(value),
                _ => {}
            }
        }

        let required = |field: Option<String>, name: &str| {
            field.ok_or_else(|| AuthError::MalformedCredentials(format!("missing {name}")))
        };

        Ok(Self {
            username: required(username, "username")?,
            realm: required(realm, "realm")?,
            nonce: required(nonce, "nonce")?,
            uri: required(uri, "uri")?,
            qop,
            nc,
            cnonce,
            response: required(response, "response")?,
            opaque,
            algorithm,
        })
    }
}

/// Splits on commas that are not inside double quotes.
fn split_params(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in params.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(params[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(params[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

fn unquote(value: &str) -> String {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => value.to_string(),
    }
}

/// Result of a digest authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestOutcome {
    /// Credentials were accepted for this username.
    Authenticated(String),
    /// The caller must answer this challenge (HTTP 401).
    Challenge(DigestChallenge),
}

/// Authenticates requests carrying digest credentials.
#[derive(Clone)]
pub struct DigestAuthenticator {
    nonces: Arc<NonceGuard>,
    validator: Arc<dyn CredentialValidator>,
    realm: String,
    domain: String,
    algorithm: DigestAlgorithm,
    max_age_millis: i64,
}

impl fmt::Debug for DigestAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestAuthenticator")
            .field("realm", &self.realm)
            .field("domain", &self.domain)
            .field("algorithm", &self.algorithm)
            .field("max_age_millis", &self.max_age_millis)
            .finish_non_exhaustive()
    }
}

impl DigestAuthenticator {
    /// Creates an authenticator from the `[digest]` settings.
    #[must_use]
    pub fn new(
        nonces: Arc<NonceGuard>,
        validator: Arc<dyn CredentialValidator>,
        config: &DigestConfig,
    ) -> Self {
        Self {
            nonces,
            validator,
            realm: config.realm.clone(),
            domain: config.domain.clone(),
            algorithm: config.algorithm,
            max_age_millis: config.nonce_max_age_millis,
        }
    }

    /// Returns the nonce store.
    #[must_use]
    pub const fn nonces(&self) -> &Arc<NonceGuard> {
        &self.nonces
    }

    /// Builds a challenge with a newly issued nonce for `session_id`.
    #[must_use]
    pub fn challenge(&self, session_id: &str, stale: bool) -> DigestChallenge {
        DigestChallenge {
            realm: self.realm.clone(),
            domain: self.domain.clone(),
            nonce: self.nonces.issue(session_id),
            algorithm: self.algorithm.to_string(),
            stale,
        }
    }

    /// Authenticates the `Authorization` header of a request.
    ///
    /// # Errors
    ///
    /// Returns an error only if the credential validator fails.
    #[instrument(skip(self, authorization))]
    pub async fn authenticate(
        &self,
        session_id: &str,
        authorization: Option<&str>,
        method: &str,
    ) -> AuthResult<DigestOutcome> {
        let Some(header) = authorization else {
            return Ok(DigestOutcome::Challenge(self.challenge(session_id, false)));
        };

        let credentials = match DigestCredentials::parse(header) {
            Ok(credentials) => credentials,
            Err(e) => {
                debug!(error = %e, "rejecting unparseable credentials");
                return Ok(DigestOutcome::Challenge(self.challenge(session_id, false)));
            }
        };

        if credentials.realm != self.realm {
            debug!(realm = %credentials.realm, "credentials for another realm");
            return Ok(DigestOutcome::Challenge(self.challenge(session_id, false)));
        }

        match self
            .nonces
            .check(session_id, &credentials.nonce, self.max_age_millis)
        {
            NonceStatus::Valid => {}
            NonceStatus::Stale => {
                return Ok(DigestOutcome::Challenge(self.challenge(session_id, true)))
            }
            NonceStatus::Invalid => {
                debug!("unknown nonce");
                return Ok(DigestOutcome::Challenge(self.challenge(session_id, false)));
            }
        }

        if self.validator.validate(&credentials, method).await? {
            info!(username = %credentials.username, "digest authentication succeeded");
            Ok(DigestOutcome::Authenticated(credentials.username))
        } else {
            debug!(username = %credentials.username, "digest credentials rejected");
            Ok(DigestOutcome::Challenge(self.challenge(session_id, false)))
        }
    }
}
