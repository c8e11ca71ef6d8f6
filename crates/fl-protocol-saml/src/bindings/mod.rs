//! SAML bindings.
//!
//! - **HTTP-POST** - the document is base64-encoded and carried in an
//!   auto-submitting HTML form
//! - **HTTP-Redirect** - the document is deflated, base64-encoded and
//!   URL-encoded into the query string
//!
//! [`BindingCodec`] selects between them from configuration. The binding is
//! always explicit; inbound messages are never sniffed.

mod codec;
mod post;
mod redirect;

pub use codec::*;
pub use post::*;
pub use redirect::*;

use serde::Deserialize;

use crate::error::{SamlError, SamlResult};

/// SAML message type for binding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// Request-shaped message.
    Request,
    /// Response-shaped message.
    Response,
}

impl SamlMessageType {
    /// Returns the form parameter name for this message type.
    #[must_use]
    pub const fn form_param(&self) -> &'static str {
        match self {
            Self::Request => "SAMLRequest",
            Self::Response => "SAMLResponse",
        }
    }
}

/// Picks the message parameter to decode. A request wins when both are sent.
fn select_message<'a>(
    saml_request: Option<&'a str>,
    saml_response: Option<&'a str>,
) -> SamlResult<(&'a str, SamlMessageType)> {
    match (saml_request, saml_response) {
        (Some(value), _) => Ok((value, SamlMessageType::Request)),
        (None, Some(value)) => Ok((value, SamlMessageType::Response)),
        (None, None) => Err(SamlError::InvalidRequest(
            "neither SAMLRequest nor SAMLResponse was sent".to_string(),
        )),
    }
}

/// Raw binding parameters as received over HTTP, from either the query
/// string or a form body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SamlParams {
    /// Encoded request document.
    #[serde(rename = "SAMLRequest")]
    pub saml_request: Option<String>,

    /// Encoded response document.
    #[serde(rename = "SAMLResponse")]
    pub saml_response: Option<String>,

    /// Relay state.
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,

    /// Detached signature (Redirect binding).
    #[serde(rename = "Signature")]
    pub signature: Option<String>,

    /// Signature algorithm URI (Redirect binding).
    #[serde(rename = "SigAlg")]
    pub sig_alg: Option<String>,

    /// Global logout flag.
    #[serde(rename = "GLO")]
    pub glo: Option<String>,

    /// Query string as received. Redirect signatures are checked against it.
    #[serde(skip)]
    pub raw_query: Option<String>,
}

impl SamlParams {
    /// Returns true if either message parameter is present.
    #[must_use]
    pub const fn has_message(&self) -> bool {
        self.saml_request.is_some() || self.saml_response.is_some()
    }

    /// Returns true if `GLO=true` was sent.
    #[must_use]
    pub fn is_global_logout(&self) -> bool {
        self.glo
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

/// Decoded SAML binding message.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    /// The decoded XML document.
    pub xml: String,
    /// The message type (request or response).
    pub message_type: SamlMessageType,
    /// The RelayState if present.
    pub relay_state: Option<String>,
    /// The detached signature (Redirect binding).
    pub signature: Option<String>,
    /// The signature algorithm URI (Redirect binding).
    pub sig_alg: Option<String>,
    /// The query string the detached signature covers.
    pub signed_query: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_logout_flag() {
        let mut params = SamlParams {
            glo: Some("TRUE".to_string()),
            ..SamlParams::default()
        };
        assert!(params.is_global_logout());
        assert!(!params.has_message());

        params.glo = Some("false".to_string());
        assert!(!params.is_global_logout());
    }
}
