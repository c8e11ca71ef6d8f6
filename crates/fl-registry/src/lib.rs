//! # fl-registry
//!
//! Registries tracking issued and revoked security tokens.
//!
//! ## Registries
//!
//! - [`TokenRegistry`] - issued token ID to token snapshot
//! - [`RevocationRegistry`] - canceled token IDs, never removed
//!
//! ## Backends
//!
//! - [`MemoryTokenRegistry`] / [`MemoryRevocationRegistry`] - process memory
//! - [`FileTokenRegistry`] / [`FileRevocationRegistry`] - append-only JSON
//!   lines log replayed at start
//! - PostgreSQL, in the `fl-storage-sql` crate
//!
//! All backends synchronize internally; callers never lock around them.
//!
//! ## Example
//!
//! ```ignore
//! use fl_registry::{RegistrySet, RevocationRegistry};
//!
//! let registries = RegistrySet::open(&config.registry)?;
//! registries.revocations.revoke(&token.id).await?;
//! assert!(registries.revocations.is_revoked(&token.id).await?);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod file;
pub mod memory;
pub mod revocation;
pub mod set;
pub mod token;

pub use error::{RegistryError, RegistryResult};
pub use file::{FileRevocationRegistry, FileTokenRegistry};
pub use memory::{MemoryRevocationRegistry, MemoryTokenRegistry};
pub use revocation::RevocationRegistry;
pub use set::{open_revocations, open_tokens, RegistrySet};
pub use token::TokenRegistry;
