//! # fl-crypto
//!
//! Cryptographic capabilities for ferrolink using aws-lc-rs.
//!
//! The protocol layers only see the [`Signer`], [`Verifier`] and
//! [`Decrypter`] traits; the RSA implementations in [`rsa`] and
//! [`encryption`] back them. SAML 2.0 interoperability
//! requires RSA-SHA256 support, so it is offered alongside SHA-384/512.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod encryption;
pub mod hash;
pub mod random;
pub mod rsa;
pub mod signature;

pub use encryption::{Decrypter, EncryptionError, RsaDecrypter, RsaEncrypter};
pub use hash::{constant_time_eq, md5, sha256, sha384, sha512, to_hex};
pub use random::{generate_session_id, generate_token_id, random_alphanumeric, random_bytes};
pub use rsa::{RsaSigner, RsaVerifier};
pub use signature::{SignatureAlgorithm, SignatureError, Signer, Verifier};
