//! Detached signatures for the HTTP-Redirect binding.

use base64::Engine;
use fl_crypto::{SignatureAlgorithm, Signer, Verifier};
use tracing::warn;

use crate::bindings::DecodedMessage;
use crate::error::{SamlError, SamlResult};

/// Appends `SigAlg` and `Signature` to an encoded Redirect query.
///
/// `query` is the `SAMLRequest=..[&RelayState=..]` part produced by the
/// binding; the result is ready to be appended to the destination URL.
///
/// # Errors
///
/// Returns [`SamlError::Crypto`] if signing fails.
pub fn sign_redirect_query(query: &str, signer: &dyn Signer) -> SamlResult<String> {
    let signed = format!(
        "{query}&SigAlg={}",
        urlencoding::encode(signer.algorithm().uri())
    );
    let signature = signer.sign(signed.as_bytes())?;
    let signature_b64 = base64::engine::general_purpose::STANDARD.encode(signature);

    Ok(format!(
        "{signed}&Signature={}",
        urlencoding::encode(&signature_b64)
    ))
}

/// Verifies the detached signature of a decoded Redirect message.
///
/// # Errors
///
/// Returns [`SamlError::SignatureInvalid`] if the message is unsigned, the
/// algorithm is unknown, or the signature does not verify.
pub fn verify_redirect(message: &DecodedMessage, key: &dyn Verifier) -> SamlResult<()> {
    let result = verify_detached(message, key);
    if let Err(e) = &result {
        warn!(error = %e, "rejected redirect signature");
    }
    result
}

fn verify_detached(message: &DecodedMessage, key: &dyn Verifier) -> SamlResult<()> {
    let (Some(signed_query), Some(signature), Some(sig_alg)) = (
        message.signed_query.as_deref(),
        message.signature.as_deref(),
        message.sig_alg.as_deref(),
    ) else {
        return Err(SamlError::SignatureInvalid("message is not signed".to_string()));
    };

    let algorithm = SignatureAlgorithm::from_uri(sig_alg)
        .ok_or_else(|| SamlError::SignatureInvalid(format!("unknown signature algorithm: {sig_alg}")))?;

    let raw = base64::engine::general_purpose::STANDARD
        .decode(signature)
        .map_err(|e| SamlError::SignatureInvalid(format!("invalid signature encoding: {e}")))?;

    match key.verify(algorithm, signed_query.as_bytes(), &raw) {
        Ok(true) => Ok(()),
        Ok(false) => Err(SamlError::SignatureInvalid("signature does not match".to_string())),
        Err(e) => Err(SamlError::SignatureInvalid(e.to_string())),
    }
}
