//! # fl-storage-sql
//!
//! SQLx-based `PostgreSQL` backends for the ferrolink registries.
//!
//! - [`PgTokenRegistry`] - issued tokens, payload stored as JSONB
//! - [`PgRevocationRegistry`] - revoked token IDs
//!
//! The schema lives in the workspace `migrations/` directory and is applied
//! with [`run_migrations`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod pool;
pub mod revocation;
pub mod token;

pub use pool::{create_pool, run_migrations, PoolConfig};
pub use revocation::PgRevocationRegistry;
pub use token::PgTokenRegistry;
