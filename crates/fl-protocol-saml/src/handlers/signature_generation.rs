//! Outbound signing.

use fl_core::config::Binding;
use tracing::debug;

use crate::bindings::{HttpRedirectBinding, SamlMessageType};
use crate::error::{SamlError, SamlResult};
use crate::handler::{Handler, HandlerRequest, HandlerResponse};
use crate::signature::{sign_redirect_query, EnvelopedSignature};
use crate::types::RequestMessage;

/// Signs the document earlier handlers produced, when signatures are on.
///
/// For the Redirect binding the signature is detached and the complete
/// query string is stored in [`HandlerResponse::destination_query_string`];
/// for POST the signed document is stored in
/// [`HandlerResponse::signed_document`]. Must run after the handlers that
/// set the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureGenerationHandler;

impl SignatureGenerationHandler {
    /// Registered name.
    pub const NAME: &'static str = "signature_generation";

    fn sign(request: &HandlerRequest, response: &mut HandlerResponse) -> SamlResult<()> {
        if !request.config.supports_signatures {
            return Ok(());
        }
        let Some(document) = &response.document else {
            return Ok(());
        };
        let signer = request
            .signing_key
            .as_ref()
            .ok_or_else(|| SamlError::Configuration("signatures enabled without a signing key".to_string()))?;

        let xml = document.to_xml();
        match request.config.binding {
            Binding::Redirect => {
                let message_type = if response.send_request {
                    SamlMessageType::Request
                } else {
                    SamlMessageType::Response
                };
                let query =
                    HttpRedirectBinding::encode_query(&xml, response.relay_state.as_deref(), message_type)?;
                response.destination_query_string = Some(sign_redirect_query(&query, signer.as_ref())?);
            }
            Binding::Post => {
                response.signed_document = Some(EnvelopedSignature::sign(&xml, signer.as_ref())?);
            }
        }

        debug!(document_id = document.id(), binding = ?request.config.binding, "signed outbound document");
        Ok(())
    }
}

impl Handler for SignatureGenerationHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn generate_request(&self, request: &HandlerRequest, response: &mut HandlerResponse) -> SamlResult<()> {
        Self::sign(request, response)
    }

    fn handle_request(
        &self,
        _message: &RequestMessage,
        request: &HandlerRequest,
        response: &mut HandlerResponse,
    ) -> SamlResult<()> {
        Self::sign(request, response)
    }
}
