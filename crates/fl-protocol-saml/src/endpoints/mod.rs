//! Axum endpoints for the service provider.
//!
//! ```rust,ignore
//! use fl_protocol_saml::endpoints::{sp_router, SpState};
//!
//! let app = axum::Router::new()
//!     .merge(sp_router())
//!     .with_state(SpState::new(processor));
//! ```

mod router;
mod sp;
mod state;

pub use router::*;
pub use sp::*;
pub use state::*;
