//! Issued-token registry.

use async_trait::async_trait;
use fl_core::Token;

use crate::error::RegistryResult;

/// Registry of issued tokens, keyed by token ID.
///
/// Entries are never mutated in place: an update is a `remove` followed by
/// a `put`.
#[async_trait]
pub trait TokenRegistry: Send + Sync {
    /// Records an issued token.
    async fn put(&self, id: &str, token: &Token) -> RegistryResult<()>;

    /// Returns the token recorded under `id`.
    async fn get(&self, id: &str) -> RegistryResult<Option<Token>>;

    /// Removes the token recorded under `id`. Removing an unknown ID is not
    /// an error.
    async fn remove(&self, id: &str) -> RegistryResult<()>;

    /// Returns the number of recorded tokens.
    async fn len(&self) -> RegistryResult<usize>;

    /// Returns true if no tokens are recorded.
    async fn is_empty(&self) -> RegistryResult<bool> {
        Ok(self.len().await? == 0)
    }
}
