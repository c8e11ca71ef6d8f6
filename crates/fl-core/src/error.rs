//! Error handling for ferrolink.
//!
//! Negative validation outcomes (a revoked token, an expired assertion, a stale
//! nonce) are result states and never appear here.

use thiserror::Error;

/// Result type alias using the ferrolink error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ferrolink operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid static setup, surfaced at startup or first use.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed inbound bytes.
    #[error("parsing error: {0}")]
    Parsing(String),

    /// A handler or the dispatcher failed mid-operation.
    #[error("processing error: {0}")]
    Processing(String),

    /// No token provider matched the request.
    #[error("no token provider found for {0}")]
    NoProviderFound(String),

    /// The caller may not invoke the requested operation.
    #[error("access denied")]
    PermissionDenied,

    /// A signature did not verify.
    #[error("signature invalid: {0}")]
    SignatureInvalid(String),

    /// Registry or database failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Internal error.
    #[error("internal error")]
    Internal,
}

impl Error {
    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Processing(_) | Self::Storage(_) | Self::Internal
        )
    }

    /// Returns whether this error represents a client error.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Parsing(_)
                | Self::NoProviderFound(_)
                | Self::PermissionDenied
                | Self::SignatureInvalid(_)
        )
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}
