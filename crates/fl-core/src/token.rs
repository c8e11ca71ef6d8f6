//! Security tokens and qualified element names.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A namespace-qualified XML element name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    /// Namespace URI.
    pub namespace: String,
    /// Local part.
    pub local: String,
}

impl QName {
    /// Creates a qualified name.
    #[must_use]
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace, self.local)
    }
}

/// A security token produced by a token provider.
///
/// The payload is opaque to everything but the issuing provider; the
/// registries only store and return snapshots of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Unique identifier assigned at issuance.
    pub id: String,
    /// Token type identifier.
    pub token_type: String,
    /// Relying service the token was issued for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Token family, used with `element` to find the provider again.
    pub family: String,
    /// Qualified name of the token's root element.
    pub element: QName,
    /// Serialized token.
    pub payload: String,
    /// Start of the token lifetime.
    pub created: DateTime<Utc>,
    /// End of the token lifetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

impl Token {
    /// Returns true if the lifetime has an end that lies at or before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| now >= expires)
    }
}
