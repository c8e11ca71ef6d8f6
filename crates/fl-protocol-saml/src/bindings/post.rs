//! HTTP-POST binding.

use base64::Engine;

use crate::error::{SamlError, SamlResult};

use super::{select_message, DecodedMessage, SamlMessageType};

/// HTTP-POST binding encoder/decoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Encodes a document as an HTML form that auto-submits to `destination`.
    ///
    /// The document is base64-encoded as-is; a signed document keeps its
    /// exact bytes.
    #[must_use]
    pub fn encode(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        message_type: SamlMessageType,
    ) -> String {
        let mut fields = format!(
            r#"<input type="hidden" name="{}" value="{}"/>"#,
            message_type.form_param(),
            base64::engine::general_purpose::STANDARD.encode(xml)
        );
        if let Some(rs) = relay_state {
            fields.push_str(&format!(
                r#"<input type="hidden" name="RelayState" value="{}"/>"#,
                html_escape(rs)
            ));
        }

        format!(
            concat!(
                "<!DOCTYPE html>\n",
                "<html><head><meta charset=\"UTF-8\"><title>Continue</title></head>\n",
                "<body onload=\"document.forms[0].submit()\">\n",
                "<form method=\"post\" action=\"{action}\">{fields}",
                "<noscript><button type=\"submit\">Continue</button></noscript>",
                "</form>\n</body></html>"
            ),
            action = html_escape(destination),
            fields = fields,
        )
    }

    /// Decodes a message from HTTP-POST form data.
    ///
    /// # Errors
    ///
    /// Returns an error if neither message parameter is present or the
    /// value is not base64-encoded UTF-8.
    pub fn decode(
        saml_request: Option<&str>,
        saml_response: Option<&str>,
        relay_state: Option<&str>,
    ) -> SamlResult<DecodedMessage> {
        let (encoded, message_type) = select_message(saml_request, saml_response)?;

        // Form encoders may wrap long values
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let decoded = base64::engine::general_purpose::STANDARD.decode(compact)?;

        let xml = String::from_utf8(decoded)
            .map_err(|e| SamlError::InvalidRequest(format!("Invalid UTF-8 in message: {e}")))?;

        Ok(DecodedMessage {
            xml,
            message_type,
            relay_state: relay_state.map(String::from),
            signature: None,
            sig_alg: None,
            signed_query: None,
        })
    }
}

/// Escapes HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Extracts the value of a hidden form field from a POST binding page.
#[must_use]
pub fn form_field<'a>(html: &'a str, name: &str) -> Option<&'a str> {
    let marker = format!(r#"name="{name}" value=""#);
    let start = html.find(&marker)? + marker.len();
    let len = html[start..].find('"')?;
    Some(&html[start..start + len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_form_carries_document_byte_for_byte() {
        let xml = r#"<samlp:AuthnRequest ID="_x">test</samlp:AuthnRequest>"#;
        let html = HttpPostBinding::encode(
            xml,
            "https://idp.example.com",
            Some("state123"),
            SamlMessageType::Request,
        );

        assert!(html.contains(r#"action="https://idp.example.com""#));
        assert_eq!(form_field(&html, "RelayState"), Some("state123"));

        let encoded = form_field(&html, "SAMLRequest").unwrap();
        let decoded = HttpPostBinding::decode(Some(encoded), None, Some("state123")).unwrap();
        assert_eq!(decoded.xml, xml);
        assert_eq!(decoded.message_type, SamlMessageType::Request);
    }

    #[test]
    fn decode_response_parameter() {
        let xml = "<samlp:Response/>";
        let html = HttpPostBinding::encode(xml, "https://sp.example.com", None, SamlMessageType::Response);
        assert!(!html.contains("RelayState"));

        let encoded = form_field(&html, "SAMLResponse").unwrap();
        let decoded = HttpPostBinding::decode(None, Some(encoded), None).unwrap();
        assert_eq!(decoded.message_type, SamlMessageType::Response);
        assert_eq!(decoded.xml, xml);
    }

    #[test]
    fn decode_rejects_missing_and_garbage() {
        assert!(HttpPostBinding::decode(None, None, None).is_err());
        assert!(matches!(
            HttpPostBinding::decode(Some("!!not base64!!"), None, None),
            Err(SamlError::Base64Decode(_))
        ));
    }

    #[test]
    fn html_escape_special_chars() {
        let escaped = html_escape(r#"<script>alert("xss")</script>"#);
        assert!(!escaped.contains('<'));
        assert!(!escaped.contains('"'));
    }
}
