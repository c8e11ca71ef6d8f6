//! In-memory registry backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fl_core::Token;

use crate::error::RegistryResult;
use crate::revocation::RevocationRegistry;
use crate::token::TokenRegistry;

/// Issued-token registry held in process memory.
#[derive(Debug, Default)]
pub struct MemoryTokenRegistry {
    tokens: DashMap<String, Token>,
}

impl MemoryTokenRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenRegistry for MemoryTokenRegistry {
    async fn put(&self, id: &str, token: &Token) -> RegistryResult<()> {
        self.tokens.insert(id.to_string(), token.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> RegistryResult<Option<Token>> {
        Ok(self.tokens.get(id).map(|entry| entry.value().clone()))
    }

    async fn remove(&self, id: &str) -> RegistryResult<()> {
        self.tokens.remove(id);
        Ok(())
    }

    async fn len(&self) -> RegistryResult<usize> {
        Ok(self.tokens.len())
    }
}

/// Revocation registry held in process memory.
#[derive(Debug, Default)]
pub struct MemoryRevocationRegistry {
    revoked: DashMap<String, DateTime<Utc>>,
}

impl MemoryRevocationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns when `id` was first revoked.
    #[must_use]
    pub fn revoked_at(&self, id: &str) -> Option<DateTime<Utc>> {
        self.revoked.get(id).map(|entry| *entry.value())
    }
}

#[async_trait]
impl RevocationRegistry for MemoryRevocationRegistry {
    async fn revoke(&self, id: &str) -> RegistryResult<()> {
        self.revoked.entry(id.to_string()).or_insert_with(Utc::now);
        Ok(())
    }

    async fn is_revoked(&self, id: &str) -> RegistryResult<bool> {
        Ok(self.revoked.contains_key(id))
    }
}
