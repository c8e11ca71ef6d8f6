//! `PostgreSQL` revocation registry.

use async_trait::async_trait;
use fl_registry::{RegistryResult, RevocationRegistry};
use sqlx::PgPool;
use tracing::debug;

use crate::error::from_sqlx_error;

/// `PostgreSQL` revocation registry.
///
/// Revocation is an insert that ignores conflicts, so concurrent revokes of
/// the same ID leave exactly one row with the first revocation instant.
#[derive(Debug, Clone)]
pub struct PgRevocationRegistry {
    pool: PgPool,
}

impl PgRevocationRegistry {
    /// Creates a registry over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationRegistry for PgRevocationRegistry {
    async fn revoke(&self, id: &str) -> RegistryResult<()> {
        let result = sqlx::query(
            "INSERT INTO fl_revoked_tokens (id, revoked_at) VALUES ($1, NOW()) ON CONFLICT (id) DO NOTHING",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        if result.rows_affected() == 0 {
            debug!(token_id = %id, "token already revoked");
        }
        Ok(())
    }

    async fn is_revoked(&self, id: &str) -> RegistryResult<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM fl_revoked_tokens WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(from_sqlx_error)?;

        Ok(exists)
    }
}
