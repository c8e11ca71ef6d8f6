//! SAML authentication responses.

use chrono::{DateTime, Utc};

use crate::error::{SamlError, SamlResult};
use crate::xml::{escape, Element};

use super::{
    format_instant, issue_instant, issuer, optional_attr_xml, required_attr, Assertion, Status,
    SAMLP_NS, SAML_NS, SAML_VERSION,
};

/// SAML Response carrying assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Unique response ID.
    pub id: String,
    /// Responding identity provider.
    pub issuer: String,
    /// When the response was issued.
    pub issue_instant: DateTime<Utc>,
    /// Recipient URL.
    pub destination: Option<String>,
    /// ID of the request this answers.
    pub in_response_to: Option<String>,
    /// Outcome of the authentication.
    pub status: Status,
    /// Assertions about the authenticated principal.
    pub assertions: Vec<Assertion>,
}

impl Response {
    /// Creates a success response with a fresh ID.
    #[must_use]
    pub fn success(issuer: impl Into<String>) -> Self {
        Self {
            id: fl_crypto::generate_token_id(),
            issuer: issuer.into(),
            issue_instant: Utc::now(),
            destination: None,
            in_response_to: None,
            status: Status::success(),
            assertions: Vec::new(),
        }
    }

    /// Replaces the status.
    #[must_use]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
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

    /// Adds an assertion.
    #[must_use]
    pub fn with_assertion(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    /// Serializes the response.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let assertions: String = self.assertions.iter().map(|a| a.render(false)).collect();

        format!(
            r#"<samlp:Response xmlns:samlp="{SAMLP_NS}" xmlns:saml="{SAML_NS}" ID="{}" IssueInstant="{}" Version="{SAML_VERSION}"{}{}><saml:Issuer>{}</saml:Issuer>{}{assertions}</samlp:Response>"#,
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
            assertions: element
                .children_named("Assertion")
                .map(Assertion::from_element)
                .collect::<SamlResult<_>>()?,
        })
    }
}
