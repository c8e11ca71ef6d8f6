//! SAML single logout messages.

use chrono::{DateTime, Utc};

use crate::error::{SamlError, SamlResult};
use crate::xml::{escape, Element};

use super::{
    format_instant, issue_instant, issuer, optional_attr_xml, required_attr, Status, SAMLP_NS,
    SAML_NS, SAML_VERSION,
};

/// SAML LogoutRequest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutRequest {
    /// Unique request ID.
    pub id: String,
    /// Party asking for the logout.
    pub issuer: String,
    /// When the request was issued.
    pub issue_instant: DateTime<Utc>,
    /// Recipient URL.
    pub destination: Option<String>,
    /// Principal being logged out.
    pub name_id: String,
    /// Session to terminate.
    pub session_index: Option<String>,
}

impl LogoutRequest {
    /// Creates a logout request for `name_id` with a fresh ID.
    #[must_use]
    pub fn new(issuer: impl Into<String>, name_id: impl Into<String>) -> Self {
        Self {
            id: fl_crypto::generate_token_id(),
            issuer: issuer.into(),
            issue_instant: Utc::now(),
            destination: None,
            name_id: name_id.into(),
            session_index: None,
        }
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Sets the session index.
    #[must_use]
    pub fn with_session_index(mut self, index: impl Into<String>) -> Self {
        self.session_index = Some(index.into());
        self
    }

    /// Serializes the request.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let session_index = self
            .session_index
            .as_deref()
            .map(|s| format!("<samlp:SessionIndex>{}</samlp:SessionIndex>", escape(s)))
            .unwrap_or_default();

        format!(
            r#"<samlp:LogoutRequest xmlns:samlp="{SAMLP_NS}" xmlns:saml="{SAML_NS}" ID="{}" IssueInstant="{}" Version="{SAML_VERSION}"{}><saml:Issuer>{}</saml:Issuer><saml:NameID>{}</saml:NameID>{session_index}</samlp:LogoutRequest>"#,
            escape(&self.id),
            format_instant(self.issue_instant),
            optional_attr_xml("Destination", self.destination.as_deref()),
            escape(&self.issuer),
            escape(&self.name_id),
        )
    }

    pub(crate) fn from_element(element: &Element) -> SamlResult<Self> {
        let name_id = element
            .child_text("NameID")
            .ok_or_else(|| SamlError::MissingElement("NameID".to_string()))?;

        Ok(Self {
            id: required_attr(element, "ID")?.to_string(),
            issuer: issuer(element),
            issue_instant: issue_instant(element)?,
            destination: element.attr("Destination").map(String::from),
            name_id: name_id.to_string(),
            session_index: element.child_text("SessionIndex").map(String::from),
        })
    }
}

/// SAML LogoutResponse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutResponse {
    /// Unique response ID.
    pub id: String,
    /// Responding party.
    pub issuer: String,
    /// When the response was issued.
    pub issue_instant: DateTime<Utc>,
    /// Recipient URL.
    pub destination: Option<String>,
    /// ID of the request this answers.
    pub in_response_to: Option<String>,
    /// Outcome of the logout.
    pub status: Status,
}

impl LogoutResponse {
    /// Creates a success response.
    #[must_use]
    pub fn success(issuer: impl Into<String>) -> Self {
        Self::with_status(issuer, Status::success())
    }

    /// Creates a response carrying `status`.
    #[must_use]
    pub fn with_status(issuer: impl Into<String>, status: Status) -> Self {
        Self {
            id: fl_crypto::generate_token_id(),
            issuer: issuer.into(),
            issue_instant: Utc::now(),
            destination: None,
            in_response_to: None,
            status,
        }
    }

    /// Sets the request ID this response answers.
    #[must_use]
    pub fn in_response_to(mut self, request_id: impl Into<String>) -> Self {
        self.in_response_to = Some(request_id.into());
        self
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Returns true if the logout succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Serializes the response.
    #[must_use]
    pub fn to_xml(&self) -> String {
        format!(
            r#"<samlp:LogoutResponse xmlns:samlp="{SAMLP_NS}" xmlns:saml="{SAML_NS}" ID="{}" IssueInstant="{}" Version="{SAML_VERSION}"{}{}><saml:Issuer>{}</saml:Issuer>{}</samlp:LogoutResponse>"#,
            escape(&self.id),
            format_instant(self.issue_instant),
            optional_attr_xml("Destination", self.destination.as_deref()),
            optional_attr_xml("InResponseTo", self.in_response_to.as_deref()),
            escape(&self.issuer),
            self.status.to_xml(),
        )
    }

    pub(crate) fn from_element(element: &Element) -> SamlResult<Self> {
        let status = element
            .child("Status")
            .ok_or_else(|| SamlError::MissingElement("Status".to_string()))?;

        Ok(Self {
            id: required_attr(element, "ID")?.to_string(),
            issuer: issuer(element),
            issue_instant: issue_instant(element)?,
            destination: element.attr("Destination").map(String::from),
            in_response_to: element.attr("InResponseTo").map(String::from),
            status: Status::from_element(status)?,
        })
    }
}
