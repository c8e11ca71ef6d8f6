//! Authentication error types.

use std::fmt;

/// Digest authentication errors.
///
/// Rejected or stale credentials are not errors; they produce a challenge.
#[derive(Debug)]
pub enum AuthError {
    /// The `Authorization` header could not be parsed.
    MalformedCredentials(String),
    /// The credential store failed.
    CredentialStore(String),
    /// Internal error.
    Internal(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedCredentials(msg) => write!(f, "malformed digest credentials: {msg}"),
            Self::CredentialStore(msg) => write!(f, "credential store error: {msg}"),
            Self::Internal(msg) => write!(f, "internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<AuthError> for fl_core::Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MalformedCredentials(msg) => Self::Parsing(msg),
            AuthError::CredentialStore(msg) => Self::Storage(msg),
            AuthError::Internal(_) => Self::Internal,
        }
    }
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = AuthError::MalformedCredentials("no username".to_string());
        assert_eq!(err.to_string(), "malformed digest credentials: no username");
    }

    #[test]
    fn converts_to_core_error() {
        let err: fl_core::Error = AuthError::CredentialStore("down".to_string()).into();
        assert!(err.is_server_error());
    }
}
