//! SAML authentication requests.

use chrono::{DateTime, Utc};

use crate::error::SamlResult;
use crate::xml::{escape, Element};

use super::{
    format_instant, issue_instant, issuer, optional_attr_xml, required_attr, BINDING_HTTP_POST,
    SAMLP_NS, SAML_NS, SAML_VERSION,
};

/// SAML AuthnRequest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthnRequest {
    /// Unique request ID.
    pub id: String,
    /// Requesting service provider.
    pub issuer: String,
    /// When the request was issued.
    pub issue_instant: DateTime<Utc>,
    /// Identity provider URL the request is sent to.
    pub destination: Option<String>,
    /// Where the identity provider should deliver its response.
    pub assertion_consumer_service_url: Option<String>,
}

impl AuthnRequest {
    /// Creates a request with a fresh ID.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            id: fl_crypto::generate_token_id(),
            issuer: issuer.into(),
            issue_instant: Utc::now(),
            destination: None,
            assertion_consumer_service_url: None,
        }
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Sets the assertion consumer service URL.
    #[must_use]
    pub fn with_acs_url(mut self, url: impl Into<String>) -> Self {
        self.assertion_consumer_service_url = Some(url.into());
        self
    }

    /// Serializes the request.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let acs = self
            .assertion_consumer_service_url
            .as_deref()
            .map(|url| {
                format!(
                    r#" AssertionConsumerServiceURL="{}" ProtocolBinding="{BINDING_HTTP_POST}""#,
                    escape(url)
                )
            })
            .unwrap_or_default();

        format!(
            r#"<samlp:AuthnRequest xmlns:samlp="{SAMLP_NS}" xmlns:saml="{SAML_NS}" ID="{}" IssueInstant="{}" Version="{SAML_VERSION}"{}{acs}><saml:Issuer>{}</saml:Issuer></samlp:AuthnRequest>"#,
            escape(&self.id),
            format_instant(self.issue_instant),
            optional_attr_xml("Destination", self.destination.as_deref()),
            escape(&self.issuer),
        )
    }

    pub(crate) fn from_element(element: &Element) -> SamlResult<Self> {
        Ok(Self {
            id: required_attr(element, "ID")?.to_string(),
            issuer: issuer(element),
            issue_instant: issue_instant(element)?,
            destination: element.attr("Destination").map(String::from),
            assertion_consumer_service_url: element
                .attr("AssertionConsumerServiceURL")
                .map(String::from),
        })
    }
}
