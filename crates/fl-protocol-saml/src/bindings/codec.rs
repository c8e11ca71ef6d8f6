//! Binding selection.

use fl_core::config::Binding;

use crate::error::SamlResult;

use super::{
    append_query, DecodedMessage, HttpPostBinding, HttpRedirectBinding, SamlMessageType,
    SamlParams,
};

/// What to send back to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transmission {
    /// Auto-submitting HTML form.
    PostForm(String),
    /// Redirect location.
    Redirect(String),
}

/// Encodes and decodes documents for one configured binding.
#[derive(Debug, Clone, Copy)]
pub struct BindingCodec {
    binding: Binding,
}

impl BindingCodec {
    /// Creates a codec for `binding`.
    #[must_use]
    pub const fn new(binding: Binding) -> Self {
        Self { binding }
    }

    /// Returns the binding this codec speaks.
    #[must_use]
    pub const fn binding(&self) -> Binding {
        self.binding
    }

    /// Decodes the message carried by `params`.
    ///
    /// Redirect messages are read from `raw_query` when it is set.
    ///
    /// # Errors
    ///
    /// Returns a decoding error if the parameters do not carry a well-formed
    /// message for this binding.
    pub fn decode(&self, params: &SamlParams) -> SamlResult<DecodedMessage> {
        match self.binding {
            Binding::Post => HttpPostBinding::decode(
                params.saml_request.as_deref(),
                params.saml_response.as_deref(),
                params.relay_state.as_deref(),
            ),
            Binding::Redirect => match params.raw_query.as_deref() {
                Some(raw) => HttpRedirectBinding::decode_raw(raw),
                None => HttpRedirectBinding::decode(
                    params.saml_request.as_deref(),
                    params.saml_response.as_deref(),
                    params.relay_state.as_deref(),
                    params.signature.as_deref(),
                    params.sig_alg.as_deref(),
                ),
            },
        }
    }

    /// Encodes `xml` for transmission to `destination`.
    ///
    /// For the Redirect binding a pre-signed query string, when given, is
    /// used verbatim instead of encoding the document again.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SamlError::Deflate`] if compression fails.
    pub fn encode(
        &self,
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        message_type: SamlMessageType,
        presigned_query: Option<&str>,
    ) -> SamlResult<Transmission> {
        match self.binding {
            Binding::Post => Ok(Transmission::PostForm(HttpPostBinding::encode(
                xml,
                destination,
                relay_state,
                message_type,
            ))),
            Binding::Redirect => {
                let location = match presigned_query {
                    Some(query) => append_query(destination, query),
                    None => HttpRedirectBinding::encode(xml, destination, relay_state, message_type)?,
                };
                Ok(Transmission::Redirect(location))
            }
        }
    }
}
