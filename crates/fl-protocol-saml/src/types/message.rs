//! Protocol message classification.

use crate::error::{SamlError, SamlResult};
use crate::xml::{self, Element};

use super::{AuthnRequest, LogoutRequest, LogoutResponse, Response, Status};

/// Request-shaped protocol messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestMessage {
    /// Authentication request.
    AuthnRequest(AuthnRequest),
    /// Logout request.
    LogoutRequest(LogoutRequest),
}

/// Response-shaped protocol messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseMessage {
    /// Authentication response.
    Response(Response),
    /// Logout response.
    LogoutResponse(LogoutResponse),
}

impl ResponseMessage {
    /// Returns the response ID.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Response(r) => &r.id,
            Self::LogoutResponse(r) => &r.id,
        }
    }

    /// Returns the response status.
    #[must_use]
    pub const fn status(&self) -> &Status {
        match self {
            Self::Response(r) => &r.status,
            Self::LogoutResponse(r) => &r.status,
        }
    }

    /// Returns the ID of the request this response answers.
    #[must_use]
    pub fn in_response_to(&self) -> Option<&str> {
        match self {
            Self::Response(r) => r.in_response_to.as_deref(),
            Self::LogoutResponse(r) => r.in_response_to.as_deref(),
        }
    }
}

/// A parsed SAML protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolMessage {
    /// A request, handled by `Handler::handle_request`.
    Request(RequestMessage),
    /// A response, handled by `Handler::handle_response`.
    Response(ResponseMessage),
}

impl ProtocolMessage {
    /// Parses a serialized document into a typed message.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::XmlParse`] for malformed XML and
    /// [`SamlError::InvalidRequest`] for an unknown root element.
    pub fn parse(document: &str) -> SamlResult<Self> {
        Self::from_element(&xml::parse(document)?)
    }

    pub(crate) fn from_element(root: &Element) -> SamlResult<Self> {
        match root.name.as_str() {
            "AuthnRequest" => Ok(Self::Request(RequestMessage::AuthnRequest(
                AuthnRequest::from_element(root)?,
            ))),
            "LogoutRequest" => Ok(Self::Request(RequestMessage::LogoutRequest(
                LogoutRequest::from_element(root)?,
            ))),
            "Response" => Ok(Self::Response(ResponseMessage::Response(
                Response::from_element(root)?,
            ))),
            "LogoutResponse" => Ok(Self::Response(ResponseMessage::LogoutResponse(
                LogoutResponse::from_element(root)?,
            ))),
            other => Err(SamlError::InvalidRequest(format!(
                "unsupported message type: {other}"
            ))),
        }
    }

    /// Serializes the message.
    #[must_use]
    pub fn to_xml(&self) -> String {
        match self {
            Self::Request(RequestMessage::AuthnRequest(m)) => m.to_xml(),
            Self::Request(RequestMessage::LogoutRequest(m)) => m.to_xml(),
            Self::Response(ResponseMessage::Response(m)) => m.to_xml(),
            Self::Response(ResponseMessage::LogoutResponse(m)) => m.to_xml(),
        }
    }

    /// Returns the message ID.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Request(RequestMessage::AuthnRequest(m)) => &m.id,
            Self::Request(RequestMessage::LogoutRequest(m)) => &m.id,
            Self::Response(ResponseMessage::Response(m)) => &m.id,
            Self::Response(ResponseMessage::LogoutResponse(m)) => &m.id,
        }
    }

    /// Returns the message issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        match self {
            Self::Request(RequestMessage::AuthnRequest(m)) => &m.issuer,
            Self::Request(RequestMessage::LogoutRequest(m)) => &m.issuer,
            Self::Response(ResponseMessage::Response(m)) => &m.issuer,
            Self::Response(ResponseMessage::LogoutResponse(m)) => &m.issuer,
        }
    }

    /// Returns true for request-shaped messages.
    #[must_use]
    pub const fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }
}

impl From<AuthnRequest> for ProtocolMessage {
    fn from(m: AuthnRequest) -> Self {
        Self::Request(RequestMessage::AuthnRequest(m))
    }
}

impl From<LogoutRequest> for ProtocolMessage {
    fn from(m: LogoutRequest) -> Self {
        Self::Request(RequestMessage::LogoutRequest(m))
    }
}

impl From<Response> for ProtocolMessage {
    fn from(m: Response) -> Self {
        Self::Response(ResponseMessage::Response(m))
    }
}

impl From<LogoutResponse> for ProtocolMessage {
    fn from(m: LogoutResponse) -> Self {
        Self::Response(ResponseMessage::LogoutResponse(m))
    }
}
