//! SAML 2.0 types.
//!
//! Typed forms of the protocol messages the service provider exchanges with
//! an identity provider, plus their XML readers and writers.

mod assertion;
mod authn_request;
pub mod constants;
mod logout;
mod message;
mod response;
mod status;

pub use assertion::*;
pub use authn_request::*;
pub use constants::*;
pub use logout::*;
pub use message::*;
pub use response::*;
pub use status::*;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{SamlError, SamlResult};
use crate::xml::Element;

/// Formats an instant as `xs:dateTime` in UTC.
#[must_use]
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an `xs:dateTime` value.
///
/// # Errors
///
/// Returns [`SamlError::XmlParse`] if the value is not an RFC 3339 instant.
pub fn parse_instant(value: &str) -> SamlResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SamlError::XmlParse(format!("invalid instant '{value}': {e}")))
}

pub(crate) fn required_attr<'a>(element: &'a Element, name: &str) -> SamlResult<&'a str> {
    element
        .attr(name)
        .ok_or_else(|| SamlError::MissingElement(format!("{}@{}", element.name, name)))
}

pub(crate) fn optional_instant(element: &Element, name: &str) -> SamlResult<Option<DateTime<Utc>>> {
    element.attr(name).map(parse_instant).transpose()
}

pub(crate) fn issue_instant(element: &Element) -> SamlResult<DateTime<Utc>> {
    Ok(optional_instant(element, "IssueInstant")?.unwrap_or_else(Utc::now))
}

pub(crate) fn issuer(element: &Element) -> String {
    element.child_text("Issuer").unwrap_or_default().to_string()
}

pub(crate) fn optional_attr_xml(name: &str, value: Option<&str>) -> String {
    value
        .map(|v| format!(r#" {name}="{}""#, crate::xml::escape(v)))
        .unwrap_or_default()
}
