//! SAML error types.
//!
//! Errors raised while decoding, verifying and processing SAML messages on
//! the service-provider side.

use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML protocol errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Invalid SAML request format or content.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid SAML response format or content.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// Signature verification failed.
    #[error("signature validation failed: {0}")]
    SignatureInvalid(String),

    /// Missing required element or attribute.
    #[error("missing required element: {0}")]
    MissingElement(String),

    /// Malformed assertion conditions.
    #[error("invalid assertion: {0}")]
    Assertion(String),

    /// Assertion outside its validity window.
    #[error("assertion expired")]
    AssertionExpired,

    /// Unknown or unsupported binding.
    #[error("unsupported binding: {0}")]
    UnsupportedBinding(String),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    /// Deflate compression or decompression error.
    #[error("deflate error: {0}")]
    Deflate(String),

    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A handler failed while the chain was running.
    #[error("processing error: {0}")]
    Processing(String),

    /// Cryptographic operation error.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SamlError {
    /// Returns the SAML status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidResponse(_)
            | Self::MissingElement(_)
            | Self::XmlParse(_)
            | Self::Base64Decode(_)
            | Self::Deflate(_)
            | Self::Assertion(_)
            | Self::AssertionExpired
            | Self::SignatureInvalid(_) => "urn:oasis:names:tc:SAML:2.0:status:Requester",
            Self::UnsupportedBinding(_) => "urn:oasis:names:tc:SAML:2.0:status:RequestUnsupported",
            _ => "urn:oasis:names:tc:SAML:2.0:status:Responder",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidResponse(_)
            | Self::MissingElement(_)
            | Self::Base64Decode(_)
            | Self::Deflate(_)
            | Self::XmlParse(_)
            | Self::UnsupportedBinding(_) => 400,
            Self::SignatureInvalid(_) => 401,
            Self::Assertion(_) | Self::AssertionExpired => 403,
            _ => 500,
        }
    }

    /// Returns true if the message could not be decoded or parsed.
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        self.http_status() == 400
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}

impl From<fl_crypto::SignatureError> for SamlError {
    fn from(err: fl_crypto::SignatureError) -> Self {
        Self::Crypto(err.to_string())
    }
}

impl From<SamlError> for fl_core::Error {
    fn from(err: SamlError) -> Self {
        match err {
            SamlError::SignatureInvalid(msg) => Self::SignatureInvalid(msg),
            SamlError::Configuration(msg) => Self::Configuration(msg),
            SamlError::Processing(msg) => Self::Processing(msg),
            other if other.is_malformed() => Self::Parsing(other.to_string()),
            other => Self::Processing(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        let err = SamlError::InvalidRequest("test".to_string());
        assert_eq!(err.status_code(), "urn:oasis:names:tc:SAML:2.0:status:Requester");
        assert_eq!(err.http_status(), 400);
        assert!(err.is_malformed());

        let err = SamlError::SignatureInvalid("bad".to_string());
        assert_eq!(err.http_status(), 401);
        assert!(!err.is_malformed());

        let err = SamlError::Internal("test".to_string());
        assert_eq!(err.status_code(), "urn:oasis:names:tc:SAML:2.0:status:Responder");
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn signature_errors_keep_their_kind() {
        let core: fl_core::Error = SamlError::SignatureInvalid("digest".to_string()).into();
        assert!(matches!(core, fl_core::Error::SignatureInvalid(_)));

        let core: fl_core::Error = SamlError::Deflate("eof".to_string()).into();
        assert!(matches!(core, fl_core::Error::Parsing(_)));
    }
}
