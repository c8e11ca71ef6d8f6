//! SAML 2.0 service-provider engine for ferrolink.
//!
//! This crate provides:
//!
//! - **Typed protocol messages** - `AuthnRequest`, `Response`, logout
//!   messages and assertions, classified into [`ProtocolMessage`]
//! - **POST and Redirect bindings** - selected explicitly by
//!   [`bindings::BindingCodec`]
//! - **Assertion validity checks** - [`validator`]
//! - **Handler chain** - ordered protocol steps run under a scoped lock
//! - **Service-provider processor** - inbound and outbound SP flows
//! - **Axum endpoints** - the browser-facing SP routes
//!
//! # Architecture
//!
//! - [`types`] - SAML types and their XML form
//! - [`xml`] - minimal element tree over `quick-xml`
//! - [`bindings`] - POST and Redirect binding implementations
//! - [`signature`] - enveloped and detached signatures, key sources
//! - [`validator`] - assertion time-window checks
//! - [`handler`] - the handler contract, chain and processor
//! - [`handlers`] - built-in handlers
//! - [`sp`] - [`sp::ServiceProviderProcessor`]
//! - [`endpoints`] - Axum HTTP handlers
//! - [`error`] - error types for SAML operations
//!
//! # Example
//!
//! ```rust,ignore
//! use fl_protocol_saml::endpoints::{sp_router, SpState};
//! use fl_protocol_saml::sp::ServiceProviderProcessor;
//!
//! let processor = ServiceProviderProcessor::from_config(config.sp.clone())?;
//! let app = axum::Router::new()
//!     .merge(sp_router())
//!     .with_state(SpState::new(Arc::new(processor)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod bindings;
pub mod endpoints;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod session;
pub mod signature;
pub mod sp;
pub mod types;
pub mod validator;
pub mod xml;

pub use error::{SamlError, SamlResult};
pub use types::*;
