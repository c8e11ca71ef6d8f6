//! RSA PKCS#1 v1.5 signing and verification.

use aws_lc_rs::{
    rand::SystemRandom,
    rsa::KeySize,
    signature::{self, KeyPair, RsaKeyPair, UnparsedPublicKey},
};

use crate::signature::{SignatureAlgorithm, SignatureError, Signer, Verifier};

/// RSA private key usable as a [`Signer`].
pub struct RsaSigner {
    key_pair: RsaKeyPair,
    algorithm: SignatureAlgorithm,
    rng: SystemRandom,
}

impl std::fmt::Debug for RsaSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaSigner")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl RsaSigner {
    /// Loads a private key from PKCS#8 or PKCS#1 DER.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be parsed.
    pub fn from_der(key_der: &[u8], algorithm: SignatureAlgorithm) -> Result<Self, SignatureError> {
        let key_pair = RsaKeyPair::from_pkcs8(key_der)
            .or_else(|_| RsaKeyPair::from_der(key_der))
            .map_err(|e| SignatureError::InvalidKey(format!("invalid RSA key: {e}")))?;

        Ok(Self {
            key_pair,
            algorithm,
            rng: SystemRandom::new(),
        })
    }

    /// Generates a fresh 2048-bit key.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails.
    pub fn generate(algorithm: SignatureAlgorithm) -> Result<Self, SignatureError> {
        let key_pair = RsaKeyPair::generate(KeySize::Rsa2048)
            .map_err(|e| SignatureError::InvalidKey(format!("RSA key generation failed: {e}")))?;

        Ok(Self {
            key_pair,
            algorithm,
            rng: SystemRandom::new(),
        })
    }

    /// Returns the DER-encoded public key.
    #[must_use]
    pub fn public_key_der(&self) -> Vec<u8> {
        self.key_pair.public_key().as_ref().to_vec()
    }

    /// Returns a verifier for this key's public half.
    #[must_use]
    pub fn verifier(&self) -> RsaVerifier {
        RsaVerifier::from_der(self.public_key_der())
    }
}

impl Signer for RsaSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SignatureError> {
        let padding = match self.algorithm {
            SignatureAlgorithm::RsaSha256 => &signature::RSA_PKCS1_SHA256,
            SignatureAlgorithm::RsaSha384 => &signature::RSA_PKCS1_SHA384,
            SignatureAlgorithm::RsaSha512 => &signature::RSA_PKCS1_SHA512,
        };

        let mut sig = vec![0u8; self.key_pair.public_modulus_len()];
        self.key_pair
            .sign(padding, &self.rng, data, &mut sig)
            .map_err(|e| SignatureError::Signing(format!("RSA signing failed: {e}")))?;

        Ok(sig)
    }

    fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }
}

/// RSA public key usable as a [`Verifier`].
#[derive(Debug, Clone)]
pub struct RsaVerifier {
    public_key_der: Vec<u8>,
}

impl RsaVerifier {
    /// Wraps a DER public key (`RSAPublicKey` or `SubjectPublicKeyInfo`).
    #[must_use]
    pub fn from_der(public_key_der: impl Into<Vec<u8>>) -> Self {
        Self {
            public_key_der: public_key_der.into(),
        }
    }
}

impl Verifier for RsaVerifier {
    fn verify(
        &self,
        algorithm: SignatureAlgorithm,
        data: &[u8],
        sig: &[u8],
    ) -> Result<bool, SignatureError> {
        if self.public_key_der.is_empty() {
            return Err(SignatureError::InvalidKey("empty public key".to_string()));
        }

        let verification_alg: &dyn signature::VerificationAlgorithm = match algorithm {
            SignatureAlgorithm::RsaSha256 => &signature::RSA_PKCS1_2048_8192_SHA256,
            SignatureAlgorithm::RsaSha384 => &signature::RSA_PKCS1_2048_8192_SHA384,
            SignatureAlgorithm::RsaSha512 => &signature::RSA_PKCS1_2048_8192_SHA512,
        };

        let public_key = UnparsedPublicKey::new(verification_alg, &self.public_key_der);
        Ok(public_key.verify(data, sig).is_ok())
    }
}
