//! Request/response correlation.

use parking_lot::Mutex;
use tracing::warn;

use crate::error::SamlResult;
use crate::handler::{Handler, HandlerRequest, HandlerResponse};
use crate::types::ResponseMessage;

/// Remembers the ID of the last generated request and rejects responses
/// that answer a different one.
///
/// The remembered ID lives in the handler, so a chain that includes this
/// handler must not be shared between concurrent browser sessions.
/// Unsolicited responses pass when no request has been generated since the
/// last reset.
#[derive(Debug, Default)]
pub struct InResponseToHandler {
    expected: Mutex<Option<String>>,
}

impl InResponseToHandler {
    /// Registered name.
    pub const NAME: &'static str = "in_response_to";

    /// Creates a handler with nothing recorded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Handler for InResponseToHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn reset(&self) {
        *self.expected.lock() = None;
    }

    fn generate_request(&self, _request: &HandlerRequest, response: &mut HandlerResponse) -> SamlResult<()> {
        if let Some(document) = &response.document {
            *self.expected.lock() = Some(document.id().to_string());
        }
        Ok(())
    }

    fn handle_response(
        &self,
        message: &ResponseMessage,
        _request: &HandlerRequest,
        response: &mut HandlerResponse,
    ) -> SamlResult<()> {
        let expected = self.expected.lock().clone();
        let Some(expected) = expected else {
            return Ok(());
        };

        if message.in_response_to() != Some(expected.as_str()) {
            warn!(
                expected = %expected,
                actual = message.in_response_to().unwrap_or("-"),
                "response does not answer the outstanding request"
            );
            response.set_error(403, "InResponseTo does not match the outstanding request");
        }
        Ok(())
    }
}
