//! HTTP-Redirect binding.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::{SamlError, SamlResult};

use super::{select_message, DecodedMessage, SamlMessageType};

/// Largest document an inbound Redirect message may inflate to.
pub const MAX_INFLATED_BYTES: usize = 256 * 1024;

/// HTTP-Redirect binding encoder/decoder.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Builds the `SAMLRequest=..&RelayState=..` query for a document.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Deflate`] if compression fails.
    pub fn encode_query(
        xml: &str,
        relay_state: Option<&str>,
        message_type: SamlMessageType,
    ) -> SamlResult<String> {
        let deflated = deflate(xml.as_bytes())?;
        Ok(message_query(message_type, &STANDARD.encode(deflated), relay_state))
    }

    /// Encodes a document as a redirect URL to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Deflate`] if compression fails.
    pub fn encode(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        message_type: SamlMessageType,
    ) -> SamlResult<String> {
        Self::encode_query(xml, relay_state, message_type)
            .map(|query| append_query(destination, &query))
    }

    /// Decodes a message from HTTP-Redirect query parameters.
    ///
    /// Frameworks usually hand over values already URL-decoded. Decoding
    /// again is a no-op for base64 text.
    ///
    /// # Errors
    ///
    /// Returns an error if neither message parameter is present or any
    /// decoding stage fails.
    pub fn decode(
        saml_request: Option<&str>,
        saml_response: Option<&str>,
        relay_state: Option<&str>,
        signature: Option<&str>,
        sig_alg: Option<&str>,
    ) -> SamlResult<DecodedMessage> {
        let (raw, message_type) = select_message(saml_request, saml_response)?;

        let encoded = urlencoding::decode(raw)
            .map_err(|e| SamlError::InvalidRequest(format!("message is not URL-encoded UTF-8: {e}")))?;
        let inflated = inflate(&STANDARD.decode(encoded.as_bytes())?)?;
        let xml = String::from_utf8(inflated)
            .map_err(|e| SamlError::InvalidRequest(format!("inflated message is not UTF-8: {e}")))?;

        // Only a signed message has a signed octet string to rebuild
        let signed_query = match (signature, sig_alg) {
            (Some(_), Some(alg)) => Some(signed_query_string(message_type, &encoded, relay_state, alg)),
            _ => None,
        };

        Ok(DecodedMessage {
            xml,
            message_type,
            relay_state: relay_state.map(str::to_owned),
            signature: signature.map(str::to_owned),
            sig_alg: sig_alg.map(str::to_owned),
            signed_query,
        })
    }

    /// Decodes a message from a raw, still URL-encoded query string.
    ///
    /// The signed octet string is assembled from the components exactly as
    /// they were received, so signatures from senders that percent-encode
    /// differently still verify.
    ///
    /// # Errors
    ///
    /// Returns an error if the query carries no message or any decoding
    /// stage fails.
    pub fn decode_raw(raw_query: &str) -> SamlResult<DecodedMessage> {
        let mut components: [Option<(&str, String)>; 5] = Default::default();
        for pair in raw_query.split('&').filter(|pair| !pair.is_empty()) {
            let Some((key, value)) = url::form_urlencoded::parse(pair.as_bytes()).next() else {
                continue;
            };
            let slot = match &*key {
                "SAMLRequest" => 0,
                "SAMLResponse" => 1,
                "RelayState" => 2,
                "Signature" => 3,
                "SigAlg" => 4,
                _ => continue,
            };
            if components[slot].is_none() {
                components[slot] = Some((pair, value.into_owned()));
            }
        }
        let [request, response, relay_state, signature, sig_alg] = &components;

        let mut decoded = Self::decode(
            decoded_value(request),
            decoded_value(response),
            decoded_value(relay_state),
            decoded_value(signature),
            decoded_value(sig_alg),
        )?;

        decoded.signed_query = match (request.as_ref().or(response.as_ref()), signature, sig_alg) {
            (Some((message, _)), Some(_), Some((alg, _))) => Some(
                [Some(*message), relay_state.as_ref().map(|(raw, _)| *raw), Some(*alg)]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join("&"),
            ),
            _ => None,
        };
        Ok(decoded)
    }

    /// Decodes a message from a full redirect URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed or carries no message.
    pub fn decode_url(url: &str) -> SamlResult<DecodedMessage> {
        let parsed = url::Url::parse(url)
            .map_err(|e| SamlError::InvalidRequest(format!("redirect URL does not parse: {e}")))?;
        Self::decode_raw(parsed.query().unwrap_or_default())
    }
}

fn decoded_value<'a>(component: &'a Option<(&str, String)>) -> Option<&'a str> {
    component.as_ref().map(|(_, decoded)| decoded.as_str())
}

fn message_query(message_type: SamlMessageType, encoded: &str, relay_state: Option<&str>) -> String {
    let mut pairs = vec![(message_type.form_param(), encoded)];
    if let Some(relay_state) = relay_state {
        pairs.push(("RelayState", relay_state));
    }
    pairs
        .into_iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Builds the octet string a Redirect-binding signature covers:
/// `SAMLRequest=..&RelayState=..&SigAlg=..` with each value URL-encoded.
#[must_use]
pub fn signed_query_string(
    message_type: SamlMessageType,
    encoded_message: &str,
    relay_state: Option<&str>,
    sig_alg: &str,
) -> String {
    format!(
        "{}&SigAlg={}",
        message_query(message_type, encoded_message, relay_state),
        urlencoding::encode(sig_alg)
    )
}

/// Appends `query` to `destination` with `?` or `&` as needed.
#[must_use]
pub fn append_query(destination: &str, query: &str) -> String {
    let separator = if destination.contains('?') { '&' } else { '?' };
    format!("{destination}{separator}{query}")
}

/// Raw DEFLATE, no zlib header.
fn deflate(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(data)
        .and_then(|()| encoder.finish())
        .map_err(|e| SamlError::Deflate(format!("deflate failed: {e}")))
}

fn inflate(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut out = Vec::new();
    DeflateDecoder::new(data)
        .take(MAX_INFLATED_BYTES as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| SamlError::Deflate(format!("inflate failed: {e}")))?;
    if out.len() > MAX_INFLATED_BYTES {
        return Err(SamlError::Deflate(format!(
            "message inflates beyond {MAX_INFLATED_BYTES} bytes"
        )));
    }
    Ok(out)
}
