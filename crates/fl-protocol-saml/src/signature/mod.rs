//! Signature support.
//!
//! Keys come from a [`KeyProvider`], the identity-store collaborator. POST
//! documents carry an enveloped signature ([`EnvelopedSignature`]);
//! Redirect messages carry a detached signature over the query string.

mod enveloped;
mod redirect;

pub use enveloped::*;
pub use redirect::*;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use fl_core::config::ServiceProviderConfig;
use tracing::debug;
use fl_crypto::{Decrypter, RsaDecrypter, RsaSigner, RsaVerifier, SignatureAlgorithm, Signer, Verifier};

use crate::error::{SamlError, SamlResult};

/// Source of the keys used to sign and verify documents.
pub trait KeyProvider: Send + Sync {
    /// Returns the verification key stored under `alias`.
    fn validating_key(&self, alias: &str) -> Option<Arc<dyn Verifier>>;

    /// Returns this party's signing key.
    fn signing_key(&self) -> Option<Arc<dyn Signer>>;

    /// Returns this party's private key for decrypting inbound content.
    fn decrypting_key(&self) -> Option<Arc<dyn Decrypter>> {
        None
    }
}

/// In-memory [`KeyProvider`].
#[derive(Clone, Default)]
pub struct StaticKeyProvider {
    validating: HashMap<String, Arc<dyn Verifier>>,
    signing: Option<Arc<dyn Signer>>,
    decrypting: Option<Arc<dyn Decrypter>>,
}

impl std::fmt::Debug for StaticKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticKeyProvider")
            .field("aliases", &self.validating.keys().collect::<Vec<_>>())
            .field("signing", &self.signing.is_some())
            .field("decrypting", &self.decrypting.is_some())
            .finish()
    }
}

impl StaticKeyProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a verification key under `alias`.
    #[must_use]
    pub fn with_validating_key(mut self, alias: impl Into<String>, key: Arc<dyn Verifier>) -> Self {
        self.validating.insert(alias.into(), key);
        self
    }

    /// Sets the signing key.
    #[must_use]
    pub fn with_signing_key(mut self, key: Arc<dyn Signer>) -> Self {
        self.signing = Some(key);
        self
    }

    /// Sets the decryption key.
    #[must_use]
    pub fn with_decrypting_key(mut self, key: Arc<dyn Decrypter>) -> Self {
        self.decrypting = Some(key);
        self
    }

    /// Loads the DER key files named in the SP configuration. The
    /// decryption key falls back to the signing key file.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Configuration`] if a file cannot be read or
    /// does not hold a usable RSA key.
    pub fn from_config(config: &ServiceProviderConfig) -> SamlResult<Self> {
        let mut provider = Self::new();

        if let Some(path) = &config.signing_key_path {
            let der = read_key(path)?;
            let signer = RsaSigner::from_der(&der, SignatureAlgorithm::RsaSha256).map_err(|e| {
                SamlError::Configuration(format!("{}: {e}", path.display()))
            })?;
            provider = provider.with_signing_key(Arc::new(signer));
        }

        if let Some(path) = &config.decrypting_key_path {
            let der = read_key(path)?;
            let decrypter = RsaDecrypter::from_pkcs8(&der).map_err(|e| {
                SamlError::Configuration(format!("{}: {e}", path.display()))
            })?;
            provider = provider.with_decrypting_key(Arc::new(decrypter));
        } else if let Some(path) = &config.signing_key_path {
            // PKCS#1 signing keys load as signers only
            match RsaDecrypter::from_pkcs8(&read_key(path)?) {
                Ok(decrypter) => provider = provider.with_decrypting_key(Arc::new(decrypter)),
                Err(e) => debug!(path = %path.display(), error = %e, "signing key not usable for decryption"),
            }
        }

        for (alias, path) in &config.validating_keys {
            let der = read_key(path)?;
            provider = provider.with_validating_key(alias.clone(), Arc::new(RsaVerifier::from_der(der)));
        }

        Ok(provider)
    }
}

fn read_key(path: &Path) -> SamlResult<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| SamlError::Configuration(format!("cannot read key {}: {e}", path.display())))
}

impl KeyProvider for StaticKeyProvider {
    fn validating_key(&self, alias: &str) -> Option<Arc<dyn Verifier>> {
        self.validating.get(alias).cloned()
    }

    fn signing_key(&self) -> Option<Arc<dyn Signer>> {
        self.signing.clone()
    }

    fn decrypting_key(&self) -> Option<Arc<dyn Decrypter>> {
        self.decrypting.clone()
    }
}

/// Returns the alias under which the IdP's verification key is stored:
/// the configured alias, or else the host of the IdP URL.
///
/// # Errors
///
/// Returns [`SamlError::Configuration`] if no alias is configured and the
/// IdP URL has no host.
pub fn resolve_validating_alias(config: &ServiceProviderConfig) -> SamlResult<String> {
    if let Some(alias) = &config.validating_alias {
        return Ok(alias.clone());
    }

    url::Url::parse(&config.identity_url)
        .ok()
        .and_then(|url| url.host_str().map(String::from))
        .ok_or_else(|| {
            SamlError::Configuration(format!(
                "cannot derive validating alias from '{}'",
                config.identity_url
            ))
        })
}
