//! Provider kinds available to configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use fl_core::config::{ProviderConfig, StsConfig};
use fl_registry::RegistrySet;

use crate::error::{StsError, StsResult};
use crate::provider::TokenProvider;
use crate::saml2::Saml2ProviderFactory;

/// Everything a factory may use to build a provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderSetup<'a> {
    /// The provider's own registration.
    pub provider: &'a ProviderConfig,
    /// STS-wide settings.
    pub sts: &'a StsConfig,
    /// Issued-token and revocation registries.
    pub registries: &'a RegistrySet,
}

/// Builds providers of one kind.
pub trait ProviderFactory: Send + Sync {
    /// Kind name used in `[[sts.providers]] kind = ".."`.
    fn kind(&self) -> &'static str;

    /// Builds a provider from its registration.
    ///
    /// # Errors
    ///
    /// Returns [`StsError::Configuration`] for unusable properties.
    fn create(&self, setup: ProviderSetup<'_>) -> StsResult<Arc<dyn TokenProvider>>;
}

/// Table of provider factories by kind.
#[derive(Clone, Default)]
pub struct ProviderCatalog {
    factories: BTreeMap<&'static str, Arc<dyn ProviderFactory>>,
}

impl std::fmt::Debug for ProviderCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

impl ProviderCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding the built-in kinds (`saml2`).
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog
            .factories
            .insert(Saml2ProviderFactory::KIND, Arc::new(Saml2ProviderFactory));
        catalog
    }

    /// Adds a factory.
    ///
    /// # Errors
    ///
    /// Returns [`StsError::Configuration`] if the kind is already taken.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) -> StsResult<()> {
        let kind = factory.kind();
        if self.factories.contains_key(kind) {
            return Err(StsError::Configuration(format!(
                "provider kind '{kind}' registered twice"
            )));
        }
        self.factories.insert(kind, factory);
        Ok(())
    }

    /// Adds a factory, builder style.
    ///
    /// # Errors
    ///
    /// See [`ProviderCatalog::register`].
    pub fn with(mut self, factory: Arc<dyn ProviderFactory>) -> StsResult<Self> {
        self.register(factory)?;
        Ok(self)
    }

    /// Builds the provider for a registration.
    ///
    /// # Errors
    ///
    /// Returns [`StsError::Configuration`] for an unknown kind or a factory
    /// failure.
    pub fn create(&self, setup: ProviderSetup<'_>) -> StsResult<Arc<dyn TokenProvider>> {
        let kind = setup.provider.kind.as_str();
        let factory = self.factories.get(kind).ok_or_else(|| {
            StsError::Configuration(format!("unknown token provider kind '{kind}'"))
        })?;
        factory.create(setup)
    }

    /// Returns the registered kinds.
    #[must_use]
    pub fn kinds(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}
