//! Browser SSO.

use chrono::Utc;
use tracing::{debug, warn};

use crate::audit::{AuditEvent, AuditKind};
use crate::error::SamlResult;
use crate::handler::{Handler, HandlerRequest, HandlerResponse, RequestKind};
use crate::types::{AuthnRequest, ResponseMessage};
use crate::validator;

/// Issues authentication requests and consumes the IdP's responses.
///
/// An inbound response authenticates the session only if its status is
/// success, it carries at least one assertion, every assertion is inside
/// its validity window and the first assertion names a subject.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticationHandler;

impl AuthenticationHandler {
    /// Registered name.
    pub const NAME: &'static str = "authentication";
}

impl Handler for AuthenticationHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn generate_request(&self, request: &HandlerRequest, response: &mut HandlerResponse) -> SamlResult<()> {
        if request.kind != Some(RequestKind::Authentication) {
            return Ok(());
        }

        let service_url = &request.config.service_url;
        let mut authn = AuthnRequest::new(service_url.as_str()).with_acs_url(service_url.as_str());
        if let Some(destination) = &response.destination {
            authn = authn.with_destination(destination.as_str());
        }

        request.audit(
            AuditEvent::new(AuditKind::RequestCreated)
                .with_message_id(authn.id.as_str())
                .with_destination(response.destination.as_deref()),
        );
        debug!(request_id = %authn.id, "created authentication request");
        response.set_document(authn.into(), true);
        Ok(())
    }

    fn handle_response(
        &self,
        message: &ResponseMessage,
        request: &HandlerRequest,
        response: &mut HandlerResponse,
    ) -> SamlResult<()> {
        let ResponseMessage::Response(saml) = message else {
            return Ok(());
        };

        if !saml.status.is_success() {
            warn!(response_id = %saml.id, status = %saml.status.code, "authentication failed at the IdP");
            response.set_error(403, format!("authentication failed: {}", saml.status.code));
            return Ok(());
        }

        let Some(first) = saml.assertions.first() else {
            response.set_error(403, "response carries no assertion");
            return Ok(());
        };

        let now = Utc::now();
        for assertion in &saml.assertions {
            match validator::has_expired(assertion, now, request.config.clock_skew_millis) {
                Ok(false) => {}
                Ok(true) => {
                    warn!(assertion_id = %assertion.id, "assertion outside its validity window");
                    response.set_error(403, format!("assertion {} has expired", assertion.id));
                    return Ok(());
                }
                Err(e) => {
                    warn!(assertion_id = %assertion.id, error = %e, "assertion conditions rejected");
                    response.set_error(403, e.to_string());
                    return Ok(());
                }
            }
        }

        let Some(subject) = first.subject.as_deref() else {
            response.set_error(403, "assertion has no subject");
            return Ok(());
        };

        request
            .session
            .authenticate(subject, first.roles.clone(), first.session_index.clone());
        request.audit(
            AuditEvent::new(AuditKind::Authenticated)
                .with_message_id(saml.id.as_str())
                .with_destination(Some(subject)),
        );
        debug!(principal = subject, roles = ?first.roles, "session authenticated");
        Ok(())
    }
}
