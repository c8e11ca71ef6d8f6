//! Enveloped document signatures.
//!
//! The signature is inserted after the root element's `Issuer`. The digest
//! covers the document with the `Signature` element removed, and the RSA
//! signature covers the `SignedInfo` element exactly as serialized. No
//! canonicalization is applied, so a document must reach the verifier
//! byte-for-byte as it left the signer; the POST binding guarantees this.

use base64::Engine;
use fl_crypto::{SignatureAlgorithm, Signer, Verifier};
use tracing::warn;

use crate::error::{SamlError, SamlResult};
use crate::types::XMLDSIG_NS;
use crate::xml;

const SIGNATURE_OPEN: &str = "<ds:Signature";
const SIGNATURE_CLOSE: &str = "</ds:Signature>";
const SIGNED_INFO_OPEN: &str = "<ds:SignedInfo";
const SIGNED_INFO_CLOSE: &str = "</ds:SignedInfo>";

/// Verifies the signature carried inside a document.
pub trait DocumentVerifier: Send + Sync {
    /// Verifies `document` against `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureInvalid`] for any failure, including
    /// a missing or malformed signature.
    fn verify(&self, document: &str, key: &dyn Verifier) -> SamlResult<()>;
}

/// Enveloped RSA signature over a whole document.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopedSignature;

impl EnvelopedSignature {
    /// Signs `document` and returns it with the signature inserted.
    ///
    /// # Errors
    ///
    /// Returns an error if the document has no `ID` attribute on its root
    /// or signing fails.
    pub fn sign(document: &str, signer: &dyn Signer) -> SamlResult<String> {
        let root = xml::parse(document)?;
        let id = root
            .attr("ID")
            .ok_or_else(|| SamlError::MissingElement(format!("{}@ID", root.name)))?;

        let digest = fl_crypto::sha256(document.as_bytes());
        let signed_info = signed_info(id, signer.algorithm(), &encode(&digest));
        let signature_value = signer.sign(signed_info.as_bytes())?;

        let signature = format!(
            r#"{SIGNATURE_OPEN} xmlns:ds="{XMLDSIG_NS}">{signed_info}<ds:SignatureValue>{}</ds:SignatureValue>{SIGNATURE_CLOSE}"#,
            encode(&signature_value)
        );

        let position = insert_position(document)?;
        Ok(format!(
            "{}{signature}{}",
            &document[..position],
            &document[position..]
        ))
    }

    /// Returns true if `document` carries an enveloped signature.
    #[must_use]
    pub fn is_signed(document: &str) -> bool {
        document.contains(SIGNATURE_OPEN)
    }
}

impl DocumentVerifier for EnvelopedSignature {
    fn verify(&self, document: &str, key: &dyn Verifier) -> SamlResult<()> {
        let result = verify_enveloped(document, key);
        if let Err(e) = &result {
            warn!(error = %e, "rejected document signature");
        }
        result
    }
}

fn verify_enveloped(document: &str, key: &dyn Verifier) -> SamlResult<()> {
    let invalid = |msg: &str| SamlError::SignatureInvalid(msg.to_string());

    let start = document
        .find(SIGNATURE_OPEN)
        .ok_or_else(|| invalid("document is not signed"))?;
    let end = document[start..]
        .find(SIGNATURE_CLOSE)
        .map(|pos| start + pos + SIGNATURE_CLOSE.len())
        .ok_or_else(|| invalid("unterminated Signature element"))?;

    let signature_xml = &document[start..end];
    let unsigned = format!("{}{}", &document[..start], &document[end..]);

    let signature = xml::parse(signature_xml).map_err(|e| invalid(&e.to_string()))?;
    let digest_value = signature
        .find("DigestValue")
        .map(|e| e.text.as_str())
        .ok_or_else(|| invalid("missing DigestValue"))?;
    let signature_value = signature
        .find("SignatureValue")
        .map(|e| e.text.as_str())
        .ok_or_else(|| invalid("missing SignatureValue"))?;
    let algorithm = signature
        .find("SignatureMethod")
        .and_then(|e| e.attr("Algorithm"))
        .and_then(SignatureAlgorithm::from_uri)
        .ok_or_else(|| invalid("unsupported SignatureMethod"))?;

    if encode(&fl_crypto::sha256(unsigned.as_bytes())) != digest_value {
        return Err(invalid("digest mismatch"));
    }

    let info_start = signature_xml
        .find(SIGNED_INFO_OPEN)
        .ok_or_else(|| invalid("missing SignedInfo"))?;
    let info_end = signature_xml[info_start..]
        .find(SIGNED_INFO_CLOSE)
        .map(|pos| info_start + pos + SIGNED_INFO_CLOSE.len())
        .ok_or_else(|| invalid("unterminated SignedInfo"))?;

    let raw_signature = base64::engine::general_purpose::STANDARD
        .decode(signature_value)
        .map_err(|e| invalid(&e.to_string()))?;

    match key.verify(
        algorithm,
        signature_xml[info_start..info_end].as_bytes(),
        &raw_signature,
    ) {
        Ok(true) => Ok(()),
        Ok(false) => Err(invalid("signature does not match")),
        Err(e) => Err(invalid(&e.to_string())),
    }
}

fn signed_info(reference_id: &str, algorithm: SignatureAlgorithm, digest_b64: &str) -> String {
    format!(
        r##"{SIGNED_INFO_OPEN}><ds:CanonicalizationMethod Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"/><ds:SignatureMethod Algorithm="{}"/><ds:Reference URI="#{}"><ds:Transforms><ds:Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"/></ds:Transforms><ds:DigestMethod Algorithm="http://www.w3.org/2001/04/xmlenc#sha256"/><ds:DigestValue>{digest_b64}</ds:DigestValue></ds:Reference>{SIGNED_INFO_CLOSE}"##,
        algorithm.uri(),
        xml::escape(reference_id),
    )
}

/// Position just after the root's `Issuer`, or after the root start tag.
fn insert_position(document: &str) -> SamlResult<usize> {
    for pattern in ["</saml:Issuer>", "</Issuer>"] {
        if let Some(pos) = document.find(pattern) {
            return Ok(pos + pattern.len());
        }
    }

    let root_start = document
        .find('<')
        .and_then(|pos| {
            if document[pos..].starts_with("<?") {
                document[pos..].find("?>").map(|end| pos + end + 2)
            } else {
                Some(pos)
            }
        })
        .ok_or_else(|| SamlError::XmlParse("empty document".to_string()))?;

    document[root_start..]
        .find('>')
        .map(|pos| root_start + pos + 1)
        .ok_or_else(|| SamlError::XmlParse("malformed root element".to_string()))
}

fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use fl_crypto::RsaSigner;

    use super::*;
    use crate::types::{LogoutRequest, ProtocolMessage};

    fn signer() -> RsaSigner {
        RsaSigner::generate(SignatureAlgorithm::RsaSha256).unwrap()
    }

    #[test]
    fn sign_then_verify() {
        let signer = signer();
        let document = LogoutRequest::new("https://sp.example.com", "alice").to_xml();
        let signed = EnvelopedSignature::sign(&document, &signer).unwrap();

        assert!(EnvelopedSignature::is_signed(&signed));
        assert!(!EnvelopedSignature::is_signed(&document));
        EnvelopedSignature.verify(&signed, &signer.verifier()).unwrap();

        // The signed document still parses as the same message
        let parsed = ProtocolMessage::parse(&signed).unwrap();
        assert!(parsed.is_request());
    }

    #[test]
    fn tampered_document_is_rejected() {
        let signer = signer();
        let document = LogoutRequest::new("https://sp.example.com", "alice").to_xml();
        let signed = EnvelopedSignature::sign(&document, &signer).unwrap();
        let tampered = signed.replace("alice", "mallory");

        assert!(matches!(
            EnvelopedSignature.verify(&tampered, &signer.verifier()),
            Err(SamlError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let document = LogoutRequest::new("https://sp.example.com", "alice").to_xml();
        let signed = EnvelopedSignature::sign(&document, &signer()).unwrap();

        assert!(matches!(
            EnvelopedSignature.verify(&signed, &signer().verifier()),
            Err(SamlError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn unsigned_document_is_rejected() {
        let document = LogoutRequest::new("sp", "alice").to_xml();
        assert!(matches!(
            EnvelopedSignature.verify(&document, &signer().verifier()),
            Err(SamlError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn insert_after_root_without_issuer() {
        let pos = insert_position(r#"<?xml version="1.0"?><a ID="x"><b/></a>"#).unwrap();
        assert_eq!(pos, r#"<?xml version="1.0"?><a ID="x">"#.len());
    }
}
