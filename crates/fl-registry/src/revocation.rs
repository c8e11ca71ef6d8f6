//! Revoked-token registry.

use async_trait::async_trait;

use crate::error::RegistryResult;

/// Registry of canceled token IDs.
///
/// Once an ID is revoked it stays revoked. Revoking the same ID again is a
/// no-op and keeps the first revocation instant.
#[async_trait]
pub trait RevocationRegistry: Send + Sync {
    /// Marks a token ID as revoked.
    async fn revoke(&self, id: &str) -> RegistryResult<()>;

    /// Checks if a token ID is revoked.
    async fn is_revoked(&self, id: &str) -> RegistryResult<bool>;
}
