//! RSA-OAEP key transport.
//!
//! [`Decrypter`] is the private-key half used for inbound encrypted
//! content. It is a separate capability from [`Signer`](crate::Signer):
//! a key loaded for decryption cannot be handed to code that signs.

use std::sync::Arc;

use aws_lc_rs::rsa::{
    KeySize, OaepPrivateDecryptingKey, OaepPublicEncryptingKey, PrivateDecryptingKey,
    OAEP_SHA256_MGF1SHA256,
};
use thiserror::Error;

/// Error type for encryption and decryption.
#[derive(Debug, Error)]
pub enum EncryptionError {
    /// Invalid key format.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// Encryption failed.
    #[error("encryption failed")]
    Encryption,

    /// Decryption failed.
    #[error("decryption failed")]
    Decryption,
}

/// Decrypts content addressed to this party.
pub trait Decrypter: Send + Sync {
    /// Decrypts `ciphertext`.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptionError::Decryption`] if the ciphertext was not
    /// produced for this key.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, EncryptionError>;
}

/// RSA private key usable as a [`Decrypter`] (OAEP, SHA-256, MGF1-SHA-256).
pub struct RsaDecrypter {
    key: OaepPrivateDecryptingKey,
    encrypter: RsaEncrypter,
}

impl std::fmt::Debug for RsaDecrypter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaDecrypter").finish_non_exhaustive()
    }
}

impl RsaDecrypter {
    /// Loads a private key from PKCS#8 DER.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be parsed.
    pub fn from_pkcs8(key_der: &[u8]) -> Result<Self, EncryptionError> {
        let key = PrivateDecryptingKey::from_pkcs8(key_der)
            .map_err(|e| EncryptionError::InvalidKey(format!("invalid RSA key: {e}")))?;
        Self::wrap(key)
    }

    /// Generates a fresh 2048-bit key.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails.
    pub fn generate() -> Result<Self, EncryptionError> {
        let key = PrivateDecryptingKey::generate(KeySize::Rsa2048)
            .map_err(|e| EncryptionError::InvalidKey(format!("RSA key generation failed: {e}")))?;
        Self::wrap(key)
    }

    fn wrap(key: PrivateDecryptingKey) -> Result<Self, EncryptionError> {
        let public = OaepPublicEncryptingKey::new(key.public_key())
            .map_err(|e| EncryptionError::InvalidKey(format!("unusable public key: {e}")))?;
        let key = OaepPrivateDecryptingKey::new(key)
            .map_err(|e| EncryptionError::InvalidKey(format!("unusable private key: {e}")))?;
        Ok(Self {
            key,
            encrypter: RsaEncrypter {
                key: Arc::new(public),
            },
        })
    }

    /// Returns an encrypter for this key's public half.
    #[must_use]
    pub fn encrypter(&self) -> RsaEncrypter {
        self.encrypter.clone()
    }
}

impl Decrypter for RsaDecrypter {
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let mut out = vec![0u8; self.key.min_output_size()];
        let plaintext = self
            .key
            .decrypt(&OAEP_SHA256_MGF1SHA256, ciphertext, &mut out, None)
            .map_err(|_| EncryptionError::Decryption)?;
        Ok(plaintext.to_vec())
    }
}

/// RSA public key that encrypts for the matching [`RsaDecrypter`].
#[derive(Clone)]
pub struct RsaEncrypter {
    key: Arc<OaepPublicEncryptingKey>,
}

impl std::fmt::Debug for RsaEncrypter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaEncrypter").finish_non_exhaustive()
    }
}

impl RsaEncrypter {
    /// Encrypts `plaintext`, which must fit in a single OAEP block.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptionError::Encryption`] if the plaintext is too long.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let mut out = vec![0u8; self.key.ciphertext_size()];
        let ciphertext = self
            .key
            .encrypt(&OAEP_SHA256_MGF1SHA256, plaintext, &mut out, None)
            .map_err(|_| EncryptionError::Encryption)?;
        Ok(ciphertext.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsa::RsaSigner;
    use crate::signature::SignatureAlgorithm;

    #[test]
    fn encrypt_then_decrypt() {
        let decrypter = RsaDecrypter::generate().unwrap();
        let ciphertext = decrypter.encrypter().encrypt(b"session key").unwrap();
        assert_ne!(ciphertext.as_slice(), b"session key");
        assert_eq!(decrypter.decrypt(&ciphertext).unwrap(), b"session key");
    }

    #[test]
    fn other_key_cannot_decrypt() {
        let ours = RsaDecrypter::generate().unwrap();
        let theirs = RsaDecrypter::generate().unwrap();
        let ciphertext = theirs.encrypter().encrypt(b"secret").unwrap();
        assert!(matches!(ours.decrypt(&ciphertext), Err(EncryptionError::Decryption)));
    }

    #[test]
    fn invalid_key_is_rejected() {
        assert!(RsaDecrypter::from_pkcs8(&[]).is_err());
        // A signer is not a decryption key
        let signer = RsaSigner::generate(SignatureAlgorithm::RsaSha256).unwrap();
        assert!(RsaDecrypter::from_pkcs8(&signer.public_key_der()).is_err());
    }
}
