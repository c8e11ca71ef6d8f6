//! Application state management.

use std::sync::Arc;

use fl_auth::{CredentialValidator, DigestAuthenticator, NonceGuard, PasswordDigestValidator};
use fl_core::Config;
use fl_protocol_saml::endpoints::SpState;
use fl_protocol_saml::sp::ServiceProviderProcessor;
use fl_registry::RegistrySet;
use fl_sts::{ProviderCatalog, StsDispatcher};
use tracing::info;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<Config>,
    /// Token service dispatcher.
    pub sts: Arc<StsDispatcher>,
    /// Service-provider endpoint state.
    pub sp: SpState,
    /// Digest authenticator guarding the STS API, when enabled.
    pub digest: Option<Arc<DigestAuthenticator>>,
}

impl AppState {
    /// Builds every component from `config` over the given registries.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, or a provider, the
    /// handler chain or the SP keys cannot be built.
    pub fn build(config: Config, registries: RegistrySet) -> anyhow::Result<Self> {
        let validator: Arc<dyn CredentialValidator> =
            Arc::new(PasswordDigestValidator::from_config(&config.digest));
        Self::build_with(config, registries, ProviderCatalog::builtin(), validator)
    }

    /// Like [`AppState::build`] with an explicit provider catalog and
    /// credential validator.
    ///
    /// # Errors
    ///
    /// See [`AppState::build`].
    pub fn build_with(
        config: Config,
        registries: RegistrySet,
        catalog: ProviderCatalog,
        validator: Arc<dyn CredentialValidator>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let sts = StsDispatcher::from_config(config.sts.clone(), catalog, registries)?;
        let processor = ServiceProviderProcessor::from_config(config.sp.clone())?;

        let digest = if config.digest.enabled {
            info!(
                realm = %config.digest.realm,
                algorithm = %config.digest.algorithm,
                "digest authentication enabled for the STS API"
            );
            Some(Arc::new(DigestAuthenticator::new(
                NonceGuard::shared(),
                validator,
                &config.digest,
            )))
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            sts: Arc::new(sts),
            sp: SpState::new(Arc::new(processor)),
            digest,
        })
    }
}
