//! Built-in handlers.
//!
//! | Name                   | Role                                            |
//! |------------------------|-------------------------------------------------|
//! | `authentication`       | issues `AuthnRequest`, consumes `Response`      |
//! | `logout`               | single logout in both directions                |
//! | `in_response_to`       | binds a response to the request it answers      |
//! | `replay_guard`         | rejects response IDs already seen               |
//! | `signature_generation` | signs outbound documents                        |

mod authentication;
mod in_response_to;
mod logout;
mod replay_guard;
mod signature_generation;

pub use authentication::AuthenticationHandler;
pub use in_response_to::InResponseToHandler;
pub use logout::LogoutHandler;
pub use replay_guard::ReplayGuardHandler;
pub use signature_generation::SignatureGenerationHandler;

use std::sync::Arc;

use crate::error::{SamlError, SamlResult};
use crate::handler::{Handler, HandlerChain};

/// Creates the built-in handler registered under `name`.
///
/// # Errors
///
/// Returns [`SamlError::Configuration`] for an unknown name.
pub fn handler_by_name(name: &str) -> SamlResult<Arc<dyn Handler>> {
    let handler: Arc<dyn Handler> = match name {
        AuthenticationHandler::NAME => Arc::new(AuthenticationHandler),
        LogoutHandler::NAME => Arc::new(LogoutHandler),
        InResponseToHandler::NAME => Arc::new(InResponseToHandler::new()),
        ReplayGuardHandler::NAME => Arc::new(ReplayGuardHandler::new()),
        SignatureGenerationHandler::NAME => Arc::new(SignatureGenerationHandler),
        other => {
            return Err(SamlError::Configuration(format!("unknown handler: {other}")));
        }
    };
    Ok(handler)
}

/// Builds a chain from handler names, in order.
///
/// # Errors
///
/// See [`handler_by_name`].
pub fn chain_from_names<S: AsRef<str>>(names: &[S]) -> SamlResult<HandlerChain> {
    names
        .iter()
        .map(|name| handler_by_name(name.as_ref()))
        .collect()
}

#[cfg(test)]
pub(crate) fn test_request() -> crate::handler::HandlerRequest {
    use fl_core::config::ServiceProviderConfig;

    let config = ServiceProviderConfig {
        identity_url: "https://idp.example.com/sso".to_string(),
        ..ServiceProviderConfig::default()
    };
    crate::handler::HandlerRequest::new(Arc::new(config), Arc::new(crate::session::SpSession::new()))
}
