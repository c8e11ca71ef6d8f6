//! Single logout.

use tracing::{debug, warn};

use crate::audit::{AuditEvent, AuditKind};
use crate::error::SamlResult;
use crate::handler::{Handler, HandlerRequest, HandlerResponse, RequestKind};
use crate::types::{LogoutRequest, LogoutResponse, RequestMessage, ResponseMessage};

/// Runs single logout in both directions.
///
/// Outbound, it asks the IdP to end the authenticated principal's sessions.
/// Inbound, an IdP `LogoutRequest` clears the local session and is answered
/// with a success `LogoutResponse`; an IdP `LogoutResponse` completes a
/// logout this party started.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogoutHandler;

impl LogoutHandler {
    /// Registered name.
    pub const NAME: &'static str = "logout";
}

impl Handler for LogoutHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn generate_request(&self, request: &HandlerRequest, response: &mut HandlerResponse) -> SamlResult<()> {
        if request.kind != Some(RequestKind::Logout) {
            return Ok(());
        }

        let state = request.session.snapshot();
        let Some(principal) = state.principal else {
            response.set_error(403, "no authenticated principal to log out");
            return Ok(());
        };

        let mut logout = LogoutRequest::new(request.config.service_url.as_str(), principal);
        if let Some(destination) = &response.destination {
            logout = logout.with_destination(destination.as_str());
        }
        if let Some(index) = state.session_index {
            logout = logout.with_session_index(index);
        }

        request.audit(
            AuditEvent::new(AuditKind::RequestCreated)
                .with_message_id(logout.id.as_str())
                .with_destination(response.destination.as_deref()),
        );
        response.set_document(logout.into(), true);
        Ok(())
    }

    fn handle_request(
        &self,
        message: &RequestMessage,
        request: &HandlerRequest,
        response: &mut HandlerResponse,
    ) -> SamlResult<()> {
        let RequestMessage::LogoutRequest(logout) = message else {
            return Ok(());
        };

        request.session.clear();
        debug!(principal = %logout.name_id, request_id = %logout.id, "session cleared by IdP");
        request.audit(
            AuditEvent::new(AuditKind::LoggedOut)
                .with_message_id(logout.id.as_str())
                .with_destination(Some(logout.name_id.as_str())),
        );

        let mut reply =
            LogoutResponse::success(request.config.service_url.as_str()).in_response_to(logout.id.as_str());
        if let Some(destination) = &response.destination {
            reply = reply.with_destination(destination.as_str());
        }
        request.audit(
            AuditEvent::new(AuditKind::ResponseCreated)
                .with_message_id(reply.id.as_str())
                .with_destination(response.destination.as_deref()),
        );
        response.set_document(reply.into(), false);
        Ok(())
    }

    fn handle_response(
        &self,
        message: &ResponseMessage,
        request: &HandlerRequest,
        response: &mut HandlerResponse,
    ) -> SamlResult<()> {
        let ResponseMessage::LogoutResponse(reply) = message else {
            return Ok(());
        };

        if !reply.is_success() {
            warn!(response_id = %reply.id, status = %reply.status.code, "IdP refused logout");
            response.set_error(500, format!("logout failed: {}", reply.status.code));
            return Ok(());
        }

        let principal = request.session.principal();
        request.session.clear();
        request.audit(
            AuditEvent::new(AuditKind::LoggedOut)
                .with_message_id(reply.id.as_str())
                .with_destination(principal.as_deref()),
        );
        Ok(())
    }
}
