//! Cryptographically secure random generation.
//!
//! Used for token identifiers, session identifiers and the random component
//! of digest nonces.

use rand::distr::{Alphanumeric, SampleString};
use rand::Rng;

/// Generates a cryptographically secure random byte array.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}

/// Generates a random string of `len` alphanumeric characters.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::rng();
    Alphanumeric.sample_string(&mut rng, len)
}

/// Generates a token identifier.
///
/// The identifier starts with an underscore so it is a valid XML `ID`
/// value, followed by 32 alphanumeric characters.
#[must_use]
pub fn generate_token_id() -> String {
    format!("_{}", random_alphanumeric(32))
}

/// Generates a 32-character session identifier.
#[must_use]
pub fn generate_session_id() -> String {
    random_alphanumeric(32)
}

/// Generates a URL-safe base64-encoded random string.
#[must_use]
pub fn random_base64url(byte_len: usize) -> String {
    let bytes = random_bytes(byte_len);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}
