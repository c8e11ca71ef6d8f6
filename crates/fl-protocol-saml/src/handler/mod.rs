//! Handler chain.
//!
//! A [`Handler`] is one protocol step. Handlers are run in caller-supplied
//! order by the [`HandlerChainProcessor`], which owns the
//! [`HandlerResponse`] for the exchange and lends it to each handler in turn.

mod chain;
mod processor;

pub use chain::*;
pub use processor::*;

use std::sync::Arc;

use fl_core::config::ServiceProviderConfig;
use fl_crypto::{Decrypter, Signer, Verifier};

use crate::audit::{AuditEvent, AuditHook};
use crate::error::SamlResult;
use crate::session::SpSession;
use crate::types::{ProtocolMessage, RequestMessage, ResponseMessage};

/// Kind of message the service provider originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Ask the IdP to authenticate the user.
    Authentication,
    /// Ask the IdP to end the user's sessions.
    Logout,
}

/// One protocol step.
///
/// Handlers keep any cross-call state behind their own lock; every entry
/// point takes `&self`. The default implementations do nothing, so a
/// handler only implements the flows it participates in.
pub trait Handler: Send + Sync {
    /// Unique name of the handler within a chain.
    fn name(&self) -> &str;

    /// Clears handler-local state before an outbound flow.
    fn reset(&self) {}

    /// Contributes to an outbound document.
    ///
    /// # Errors
    ///
    /// Returns an error if the handler cannot run at all; protocol-level
    /// failures are reported through [`HandlerResponse::set_error`].
    fn generate_request(
        &self,
        _request: &HandlerRequest,
        _response: &mut HandlerResponse,
    ) -> SamlResult<()> {
        Ok(())
    }

    /// Handles an inbound request-shaped message.
    ///
    /// # Errors
    ///
    /// See [`Handler::generate_request`].
    fn handle_request(
        &self,
        _message: &RequestMessage,
        _request: &HandlerRequest,
        _response: &mut HandlerResponse,
    ) -> SamlResult<()> {
        Ok(())
    }

    /// Handles an inbound response-shaped message.
    ///
    /// # Errors
    ///
    /// See [`Handler::generate_request`].
    fn handle_response(
        &self,
        _message: &ResponseMessage,
        _request: &HandlerRequest,
        _response: &mut HandlerResponse,
    ) -> SamlResult<()> {
        Ok(())
    }
}

/// Everything a handler may read about the current exchange.
#[derive(Clone)]
pub struct HandlerRequest {
    /// Active service-provider configuration.
    pub config: Arc<ServiceProviderConfig>,
    /// Browser session the exchange belongs to.
    pub session: Arc<SpSession>,
    /// Inbound message; `None` for outbound flows.
    pub message: Option<ProtocolMessage>,
    /// Kind of document to generate in outbound flows.
    pub kind: Option<RequestKind>,
    /// Relay state received or to be sent.
    pub relay_state: Option<String>,
    /// Counterparty key for verifying signatures.
    pub verifying_key: Option<Arc<dyn Verifier>>,
    /// This party's signing key.
    pub signing_key: Option<Arc<dyn Signer>>,
    /// This party's decryption key.
    pub decrypting_key: Option<Arc<dyn Decrypter>>,
    /// Audit sink.
    pub audit: Option<Arc<dyn AuditHook>>,
}

impl std::fmt::Debug for HandlerRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRequest")
            .field("message", &self.message.as_ref().map(ProtocolMessage::id))
            .field("kind", &self.kind)
            .field("relay_state", &self.relay_state)
            .finish_non_exhaustive()
    }
}

impl HandlerRequest {
    /// Creates a request with no message, kind or keys.
    #[must_use]
    pub fn new(config: Arc<ServiceProviderConfig>, session: Arc<SpSession>) -> Self {
        Self {
            config,
            session,
            message: None,
            kind: None,
            relay_state: None,
            verifying_key: None,
            signing_key: None,
            decrypting_key: None,
            audit: None,
        }
    }

    /// Sets the inbound message.
    #[must_use]
    pub fn with_message(mut self, message: ProtocolMessage) -> Self {
        self.message = Some(message);
        self
    }

    /// Sets the outbound kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: RequestKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets the relay state.
    #[must_use]
    pub fn with_relay_state(mut self, relay_state: Option<String>) -> Self {
        self.relay_state = relay_state;
        self
    }

    /// Sets the audit hook.
    #[must_use]
    pub fn with_audit(mut self, audit: Option<Arc<dyn AuditHook>>) -> Self {
        self.audit = audit;
        self
    }

    /// Forwards `event` to the audit hook, if any.
    pub fn audit(&self, event: AuditEvent) {
        if let Some(hook) = &self.audit {
            hook.audit(event);
        }
    }
}

/// Result of an exchange, built up by the handlers.
#[derive(Debug, Clone, Default)]
pub struct HandlerResponse {
    error: Option<(u16, String)>,
    /// Where the resulting document is sent.
    pub destination: Option<String>,
    /// Resulting document.
    pub document: Option<ProtocolMessage>,
    /// Signed serialization of `document`, when signed in place.
    pub signed_document: Option<String>,
    /// Relay state to send with the document.
    pub relay_state: Option<String>,
    /// Whether the document is a request (`true`) or a response.
    pub send_request: bool,
    /// Pre-signed Redirect query string.
    pub destination_query_string: Option<String>,
}

impl HandlerResponse {
    /// Creates an empty response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags the exchange as failed with HTTP `status`.
    pub fn set_error(&mut self, status: u16, message: impl Into<String>) {
        self.error = Some((status, message.into()));
    }

    /// Returns true once a handler has flagged an error.
    #[must_use]
    pub const fn is_in_error(&self) -> bool {
        self.error.is_some()
    }

    /// Returns the HTTP status of the error, if any.
    #[must_use]
    pub fn error_code(&self) -> Option<u16> {
        self.error.as_ref().map(|(code, _)| *code)
    }

    /// Returns the error description, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|(_, msg)| msg.as_str())
    }

    /// Sets the resulting document, dropping any earlier signature.
    pub fn set_document(&mut self, document: ProtocolMessage, send_request: bool) {
        self.document = Some(document);
        self.send_request = send_request;
        self.signed_document = None;
        self.destination_query_string = None;
    }

    /// Returns the document as it should be transmitted.
    #[must_use]
    pub fn serialized_document(&self) -> Option<String> {
        self.signed_document
            .clone()
            .or_else(|| self.document.as_ref().map(ProtocolMessage::to_xml))
    }
}
