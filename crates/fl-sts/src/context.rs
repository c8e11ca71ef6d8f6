//! Request descriptors and outcomes.

use std::fmt;

use fl_core::{QName, Token};
use serde::{Deserialize, Serialize};

/// STS operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Issue a new token.
    Issue,
    /// Re-issue an existing token with a fresh lifetime.
    Renew,
    /// Cancel a token.
    Cancel,
    /// Check a token.
    Validate,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Issue => "issue",
            Self::Renew => "renew",
            Self::Cancel => "cancel",
            Self::Validate => "validate",
        })
    }
}

/// Result of validating a token. These are outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ValidationStatus {
    /// The token is valid.
    Valid,
    /// The token was canceled.
    TokenRevoked,
    /// The token is outside its validity window.
    AssertionExpired,
    /// The token cannot be validated.
    Invalid(String),
}

impl ValidationStatus {
    /// Returns true for [`ValidationStatus::Valid`].
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// What an operation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A token was issued.
    Issued(Token),
    /// A token was renewed; this is its replacement.
    Renewed(Token),
    /// A token was canceled.
    Canceled,
    /// A token was checked.
    Validated(ValidationStatus),
    /// The provider refused the operation for the given reason.
    Refused(ValidationStatus),
}

/// Descriptor of one STS call.
///
/// The caller builds it, the dispatcher hands it to the selected provider,
/// and the provider leaves its [`Outcome`] in `outcome`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolContext {
    /// Requested operation.
    pub operation: Operation,
    /// Relying service the token is for.
    pub service: Option<String>,
    /// Requested token type.
    pub token_type: Option<String>,
    /// Requested token element.
    pub element: Option<QName>,
    /// Token operated on by renew, cancel and validate.
    pub token: Option<Token>,
    /// Calling principal.
    pub principal: Option<String>,
    /// Result written by the provider.
    pub outcome: Option<Outcome>,
}

impl ProtocolContext {
    fn new(operation: Operation, token: Option<Token>) -> Self {
        Self {
            operation,
            service: None,
            token_type: None,
            element: None,
            token,
            principal: None,
            outcome: None,
        }
    }

    /// Creates an issue request.
    #[must_use]
    pub fn issue() -> Self {
        Self::new(Operation::Issue, None)
    }

    /// Creates a renew request for `token`.
    #[must_use]
    pub fn renew(token: Token) -> Self {
        Self::new(Operation::Renew, Some(token))
    }

    /// Creates a cancel request for `token`.
    #[must_use]
    pub fn cancel(token: Token) -> Self {
        Self::new(Operation::Cancel, Some(token))
    }

    /// Creates a validate request for `token`.
    #[must_use]
    pub fn validate(token: Token) -> Self {
        Self::new(Operation::Validate, Some(token))
    }

    /// Sets the relying service.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Sets the token type.
    #[must_use]
    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = Some(token_type.into());
        self
    }

    /// Sets the calling principal.
    #[must_use]
    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    /// Returns the token the request operates on.
    #[must_use]
    pub const fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_fill_the_descriptor() {
        let ctx = ProtocolContext::issue()
            .with_service("https://rp.example.com")
            .with_token_type("urn:x")
            .with_principal("alice");

        assert_eq!(ctx.operation, Operation::Issue);
        assert_eq!(ctx.service.as_deref(), Some("https://rp.example.com"));
        assert_eq!(ctx.token_type.as_deref(), Some("urn:x"));
        assert_eq!(ctx.principal.as_deref(), Some("alice"));
        assert!(ctx.token().is_none());
        assert!(ctx.outcome.is_none());
    }

    #[test]
    fn validation_status_serializes_with_reason() {
        let json = serde_json::to_string(&ValidationStatus::Invalid("bad".to_string())).unwrap();
        assert_eq!(json, r#"{"status":"invalid","reason":"bad"}"#);

        let json = serde_json::to_string(&ValidationStatus::TokenRevoked).unwrap();
        assert_eq!(json, r#"{"status":"token_revoked"}"#);
    }
}
