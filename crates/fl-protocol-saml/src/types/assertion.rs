//! SAML assertions.

use chrono::{DateTime, Utc};

use crate::error::{SamlError, SamlResult};
use crate::xml::{escape, Element};

use super::{
    format_instant, issue_instant, issuer, optional_attr_xml, optional_instant, required_attr,
    ROLE_ATTRIBUTE, SAML_NS, SAML_VERSION,
};

/// Validity window of an assertion.
///
/// Either bound may be absent in a document; see
/// [`crate::validator::is_valid`] for how partial windows are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Conditions {
    /// Earliest instant the assertion is valid.
    pub not_before: Option<DateTime<Utc>>,
    /// Instant from which the assertion is no longer valid.
    pub not_on_or_after: Option<DateTime<Utc>>,
}

impl Conditions {
    /// Creates a window `[not_before, not_on_or_after)`.
    #[must_use]
    pub const fn new(not_before: DateTime<Utc>, not_on_or_after: DateTime<Utc>) -> Self {
        Self {
            not_before: Some(not_before),
            not_on_or_after: Some(not_on_or_after),
        }
    }

    fn to_xml(self) -> String {
        format!(
            "<saml:Conditions{}{}/>",
            optional_attr_xml("NotBefore", self.not_before.map(format_instant).as_deref()),
            optional_attr_xml(
                "NotOnOrAfter",
                self.not_on_or_after.map(format_instant).as_deref()
            ),
        )
    }

    fn from_element(element: &Element) -> SamlResult<Self> {
        Ok(Self {
            not_before: optional_instant(element, "NotBefore")?,
            not_on_or_after: optional_instant(element, "NotOnOrAfter")?,
        })
    }
}

/// SAML assertion about a principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    /// Unique assertion ID.
    pub id: String,
    /// Issuing party.
    pub issuer: String,
    /// When the assertion was issued.
    pub issue_instant: DateTime<Utc>,
    /// Subject name ID.
    pub subject: Option<String>,
    /// Validity window.
    pub conditions: Option<Conditions>,
    /// Session index from the authentication statement.
    pub session_index: Option<String>,
    /// Role attribute values.
    pub roles: Vec<String>,
}

impl Assertion {
    /// Creates an assertion with the given ID and issuer.
    #[must_use]
    pub fn new(id: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            issuer: issuer.into(),
            issue_instant: Utc::now(),
            subject: None,
            conditions: None,
            session_index: None,
            roles: Vec::new(),
        }
    }

    /// Sets the subject name ID.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the validity window.
    #[must_use]
    pub const fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Sets the session index.
    #[must_use]
    pub fn with_session_index(mut self, index: impl Into<String>) -> Self {
        self.session_index = Some(index.into());
        self
    }

    /// Sets the issue instant.
    #[must_use]
    pub const fn issued_at(mut self, instant: DateTime<Utc>) -> Self {
        self.issue_instant = instant;
        self
    }

    /// Adds a role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Serializes the assertion as a standalone document.
    #[must_use]
    pub fn to_xml(&self) -> String {
        self.render(true)
    }

    pub(crate) fn render(&self, declare_ns: bool) -> String {
        let ns = if declare_ns {
            format!(r#" xmlns:saml="{SAML_NS}""#)
        } else {
            String::new()
        };

        let mut xml = format!(
            r#"<saml:Assertion{ns} ID="{}" IssueInstant="{}" Version="{SAML_VERSION}"><saml:Issuer>{}</saml:Issuer>"#,
            escape(&self.id),
            format_instant(self.issue_instant),
            escape(&self.issuer),
        );

        if let Some(subject) = &self.subject {
            xml.push_str(&format!(
                "<saml:Subject><saml:NameID>{}</saml:NameID></saml:Subject>",
                escape(subject)
            ));
        }
        if let Some(conditions) = self.conditions {
            xml.push_str(&conditions.to_xml());
        }
        if let Some(index) = &self.session_index {
            xml.push_str(&format!(
                r#"<saml:AuthnStatement AuthnInstant="{}" SessionIndex="{}"/>"#,
                format_instant(self.issue_instant),
                escape(index)
            ));
        }
        if !self.roles.is_empty() {
            xml.push_str(&format!(
                r#"<saml:AttributeStatement><saml:Attribute Name="{ROLE_ATTRIBUTE}">"#
            ));
            for role in &self.roles {
                xml.push_str(&format!(
                    "<saml:AttributeValue>{}</saml:AttributeValue>",
                    escape(role)
                ));
            }
            xml.push_str("</saml:Attribute></saml:AttributeStatement>");
        }

        xml.push_str("</saml:Assertion>");
        xml
    }

    /// Parses a standalone assertion document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a well-formed assertion.
    pub fn from_xml(xml: &str) -> SamlResult<Self> {
        Self::from_element(&crate::xml::parse(xml)?)
    }

    pub(crate) fn from_element(element: &Element) -> SamlResult<Self> {
        if element.name != "Assertion" {
            return Err(SamlError::InvalidResponse(format!(
                "expected Assertion, found {}",
                element.name
            )));
        }

        let roles = element
            .children_named("AttributeStatement")
            .flat_map(|s| s.children_named("Attribute"))
            .filter(|a| a.attr("Name") == Some(ROLE_ATTRIBUTE))
            .flat_map(|a| a.children_named("AttributeValue"))
            .map(|v| v.text.clone())
            .collect();

        Ok(Self {
            id: required_attr(element, "ID")?.to_string(),
            issuer: issuer(element),
            issue_instant: issue_instant(element)?,
            subject: element
                .child("Subject")
                .and_then(|s| s.child_text("NameID"))
                .map(String::from),
            conditions: element
                .child("Conditions")
                .map(Conditions::from_element)
                .transpose()?,
            session_index: element
                .child("AuthnStatement")
                .and_then(|s| s.attr("SessionIndex"))
                .map(String::from),
            roles,
        })
    }
}
