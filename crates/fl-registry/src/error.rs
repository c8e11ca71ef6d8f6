//! Registry error types.

use std::fmt;

/// Registry operation errors.
#[derive(Debug)]
pub enum RegistryError {
    /// Reading or writing the backing store failed.
    Io(String),
    /// A record could not be encoded or decoded.
    Serialization(String),
    /// Connection to the backing database failed.
    Connection(String),
    /// Invalid registry configuration.
    Configuration(String),
    /// Internal registry error.
    Internal(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "registry I/O error: {msg}"),
            Self::Serialization(msg) => write!(f, "registry serialization error: {msg}"),
            Self::Connection(msg) => write!(f, "registry connection error: {msg}"),
            Self::Configuration(msg) => write!(f, "registry configuration error: {msg}"),
            Self::Internal(msg) => write!(f, "internal registry error: {msg}"),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<RegistryError> for fl_core::Error {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Configuration(msg) => Self::Configuration(msg),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = RegistryError::Io("disk full".to_string());
        assert_eq!(err.to_string(), "registry I/O error: disk full");
    }

    #[test]
    fn converts_to_core_error() {
        let err: fl_core::Error = RegistryError::Configuration("no path".to_string()).into();
        assert!(matches!(err, fl_core::Error::Configuration(_)));

        let err: fl_core::Error = RegistryError::Connection("refused".to_string()).into();
        assert!(matches!(err, fl_core::Error::Storage(_)));
    }
}
