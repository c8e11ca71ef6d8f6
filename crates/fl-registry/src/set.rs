//! Backend selection.

use std::sync::Arc;

use fl_core::config::{RegistryBackend, RegistryConfig};

use crate::error::{RegistryError, RegistryResult};
use crate::file::{FileRevocationRegistry, FileTokenRegistry};
use crate::memory::{MemoryRevocationRegistry, MemoryTokenRegistry};
use crate::revocation::RevocationRegistry;
use crate::token::TokenRegistry;

/// The pair of registries a token provider works against.
#[derive(Clone)]
pub struct RegistrySet {
    /// Issued tokens.
    pub tokens: Arc<dyn TokenRegistry>,
    /// Revoked token IDs.
    pub revocations: Arc<dyn RevocationRegistry>,
}

impl std::fmt::Debug for RegistrySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrySet").finish_non_exhaustive()
    }
}

impl RegistrySet {
    /// Creates a set from explicit backends.
    #[must_use]
    pub fn new(
        tokens: Arc<dyn TokenRegistry>,
        revocations: Arc<dyn RevocationRegistry>,
    ) -> Self {
        Self {
            tokens,
            revocations,
        }
    }

    /// Creates a set of empty in-memory registries.
    #[must_use]
    pub fn memory() -> Self {
        Self::new(
            Arc::new(MemoryTokenRegistry::new()),
            Arc::new(MemoryRevocationRegistry::new()),
        )
    }

    /// Opens the memory and file backends named by `config`.
    ///
    /// The `sql` backend lives in `fl-storage-sql` and needs a connection
    /// pool, so it is rejected here.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Configuration`] for the `sql` backend or a
    /// missing file path, and I/O errors from opening log files.
    pub fn open(config: &RegistryConfig) -> RegistryResult<Self> {
        Ok(Self::new(
            open_tokens(config)?,
            open_revocations(config)?,
        ))
    }
}

/// Opens the issued-token registry named by `config`.
///
/// # Errors
///
/// See [`RegistrySet::open`].
pub fn open_tokens(config: &RegistryConfig) -> RegistryResult<Arc<dyn TokenRegistry>> {
    match config.token_backend {
        RegistryBackend::Memory => Ok(Arc::new(MemoryTokenRegistry::new())),
        RegistryBackend::File => {
            let path = config.token_file.as_ref().ok_or_else(|| {
                RegistryError::Configuration("token_file is required".to_string())
            })?;
            Ok(Arc::new(FileTokenRegistry::open(path)?))
        }
        RegistryBackend::Sql => Err(RegistryError::Configuration(
            "the sql token registry requires a database pool".to_string(),
        )),
    }
}

/// Opens the revocation registry named by `config`.
///
/// # Errors
///
/// See [`RegistrySet::open`].
pub fn open_revocations(config: &RegistryConfig) -> RegistryResult<Arc<dyn RevocationRegistry>> {
    match config.revocation_backend {
        RegistryBackend::Memory => Ok(Arc::new(MemoryRevocationRegistry::new())),
        RegistryBackend::File => {
            let path = config.revocation_file.as_ref().ok_or_else(|| {
                RegistryError::Configuration("revocation_file is required".to_string())
            })?;
            Ok(Arc::new(FileRevocationRegistry::open(path)?))
        }
        RegistryBackend::Sql => Err(RegistryError::Configuration(
            "the sql revocation registry requires a database pool".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_config_opens_memory_backends() {
        let set = RegistrySet::open(&RegistryConfig::default()).unwrap();
        set.revocations.revoke("a").await.unwrap();
        assert!(set.revocations.is_revoked("a").await.unwrap());
        assert!(set.tokens.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn file_backends_use_configured_paths() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig {
            token_backend: RegistryBackend::File,
            token_file: Some(dir.path().join("tokens.log")),
            revocation_backend: RegistryBackend::File,
            revocation_file: Some(dir.path().join("revoked.log")),
            ..RegistryConfig::default()
        };

        let set = RegistrySet::open(&config).unwrap();
        set.revocations.revoke("a").await.unwrap();
        assert!(dir.path().join("revoked.log").exists());
    }

    #[test]
    fn sql_backend_is_rejected() {
        let config = RegistryConfig {
            token_backend: RegistryBackend::Sql,
            ..RegistryConfig::default()
        };
        assert!(matches!(
            RegistrySet::open(&config),
            Err(RegistryError::Configuration(_))
        ));
    }

    #[test]
    fn file_backend_without_path_is_rejected() {
        let config = RegistryConfig {
            revocation_backend: RegistryBackend::File,
            ..RegistryConfig::default()
        };
        assert!(RegistrySet::open(&config).is_err());
    }
}
