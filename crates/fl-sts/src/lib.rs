//! Security token service.
//!
//! The [`StsDispatcher`] routes issue, renew, cancel and validate calls to
//! [`TokenProvider`]s. Providers are created from configuration through a
//! [`ProviderCatalog`] and registered by service, token type and token
//! element; they record issued tokens and revocations in a shared
//! [`fl_registry::RegistrySet`].
//!
//! ```text
//! ProtocolContext ─► PermissionGate ─► TokenProviderRegistry ─► TokenProvider
//!                                                                 │
//!                                                 RegistrySet ◄───┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod permission;
pub mod provider;
pub mod registry;
pub mod saml2;

pub use catalog::{ProviderCatalog, ProviderFactory, ProviderSetup};
pub use context::{Operation, Outcome, ProtocolContext, ValidationStatus};
pub use dispatcher::{StsDispatcher, StsSnapshot};
pub use error::{StsError, StsResult};
pub use permission::{AllowAll, PermissionGate, PrincipalAllowList};
pub use provider::TokenProvider;
pub use registry::TokenProviderRegistry;
pub use saml2::{Saml2ProviderFactory, Saml2TokenProvider, SAML2_TOKEN_TYPE};
