//! STS error types.

use fl_protocol_saml::SamlError;
use fl_registry::RegistryError;
use thiserror::Error;

/// Result type for STS operations.
pub type StsResult<T> = Result<T, StsError>;

/// Errors raised by the STS dispatcher and token providers.
///
/// Revoked or expired tokens are not errors; they are reported through
/// [`crate::ValidationStatus`].
#[derive(Debug, Error)]
pub enum StsError {
    /// Invalid provider setup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No provider is registered for the request's keys.
    #[error("no token provider found for {0}")]
    NoProviderFound(String),

    /// The caller may not invoke STS operations.
    #[error("access denied")]
    PermissionDenied,

    /// The request is missing something the operation needs.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A provider failed mid-operation.
    #[error("processing error: {0}")]
    Processing(String),

    /// Registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// SAML encoding or parsing failure.
    #[error(transparent)]
    Saml(#[from] SamlError),
}

impl From<StsError> for fl_core::Error {
    fn from(err: StsError) -> Self {
        match err {
            StsError::Configuration(msg) => Self::Configuration(msg),
            StsError::NoProviderFound(key) => Self::NoProviderFound(key),
            StsError::PermissionDenied => Self::PermissionDenied,
            StsError::InvalidRequest(msg) => Self::Parsing(msg),
            StsError::Processing(msg) => Self::Processing(msg),
            StsError::Registry(e) => e.into(),
            StsError::Saml(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_errors_are_wrapped() {
        let err: StsError = RegistryError::Io("disk full".to_string()).into();
        assert_eq!(err.to_string(), "registry I/O error: disk full");
        assert!(matches!(fl_core::Error::from(err), fl_core::Error::Storage(_)));
    }

    #[test]
    fn signature_errors_stay_signature_errors() {
        let err: StsError = SamlError::SignatureInvalid("bad".to_string()).into();
        assert!(matches!(
            fl_core::Error::from(err),
            fl_core::Error::SignatureInvalid(_)
        ));
    }
}
