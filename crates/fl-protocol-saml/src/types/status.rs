//! SAML protocol status.

use crate::error::{SamlError, SamlResult};
use crate::xml::{escape, Element};

use super::status_codes;

/// Status carried by responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Status code URI.
    pub code: String,
    /// Optional human-readable message.
    pub message: Option<String>,
}

impl Status {
    /// Creates a success status.
    #[must_use]
    pub fn success() -> Self {
        Self::new(status_codes::SUCCESS)
    }

    /// Creates a requester error status.
    #[must_use]
    pub fn requester_error(message: impl Into<String>) -> Self {
        Self::new(status_codes::REQUESTER).with_message(message)
    }

    /// Creates a responder error status.
    #[must_use]
    pub fn responder_error(message: impl Into<String>) -> Self {
        Self::new(status_codes::RESPONDER).with_message(message)
    }

    /// Creates a status with the given code.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: None,
        }
    }

    /// Sets the status message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns true if this status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == status_codes::SUCCESS
    }

    pub(crate) fn to_xml(&self) -> String {
        let message = self
            .message
            .as_deref()
            .map(|m| format!("<samlp:StatusMessage>{}</samlp:StatusMessage>", escape(m)))
            .unwrap_or_default();
        format!(
            r#"<samlp:Status><samlp:StatusCode Value="{}"/>{message}</samlp:Status>"#,
            escape(&self.code)
        )
    }

    pub(crate) fn from_element(element: &Element) -> SamlResult<Self> {
        let code = element
            .child("StatusCode")
            .and_then(|c| c.attr("Value"))
            .ok_or_else(|| SamlError::MissingElement("StatusCode".to_string()))?;
        Ok(Self {
            code: code.to_string(),
            message: element.child_text("StatusMessage").map(String::from),
        })
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::success()
    }
}
