//! `PostgreSQL` issued-token registry.

use async_trait::async_trait;
use fl_core::Token;
use fl_registry::{RegistryResult, TokenRegistry};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::error::from_sqlx_error;

/// `PostgreSQL` issued-token registry.
#[derive(Debug, Clone)]
pub struct PgTokenRegistry {
    pool: PgPool,
}

impl PgTokenRegistry {
    /// Creates a registry over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRegistry for PgTokenRegistry {
    async fn put(&self, id: &str, token: &Token) -> RegistryResult<()> {
        sqlx::query(
            r"INSERT INTO fl_issued_tokens (id, token_type, payload, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                token_type = EXCLUDED.token_type,
                payload = EXCLUDED.payload,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at",
        )
        .bind(id)
        .bind(&token.token_type)
        .bind(Json(token))
        .bind(token.created)
        .bind(token.expires)
        .execute(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        Ok(())
    }

    async fn get(&self, id: &str) -> RegistryResult<Option<Token>> {
        let row: Option<(Json<Token>,)> =
            sqlx::query_as("SELECT payload FROM fl_issued_tokens WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(from_sqlx_error)?;

        Ok(row.map(|(Json(token),)| token))
    }

    async fn remove(&self, id: &str) -> RegistryResult<()> {
        sqlx::query("DELETE FROM fl_issued_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(from_sqlx_error)?;

        Ok(())
    }

    async fn len(&self) -> RegistryResult<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM fl_issued_tokens")
            .fetch_one(&self.pool)
            .await
            .map_err(from_sqlx_error)?;

        Ok(usize::try_from(count).unwrap_or_default())
    }
}
