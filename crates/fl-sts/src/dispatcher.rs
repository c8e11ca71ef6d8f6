//! The STS entry point.

use std::sync::Arc;

use fl_core::config::StsConfig;
use fl_core::QName;
use fl_registry::RegistrySet;
use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{ProviderCatalog, ProviderSetup};
use crate::context::{Operation, Outcome, ProtocolContext};
use crate::error::{StsError, StsResult};
use crate::permission::{gate_from_config, PermissionGate};
use crate::provider::TokenProvider;
use crate::registry::TokenProviderRegistry;

/// Immutable configuration the dispatcher serves from.
pub struct StsSnapshot {
    /// STS settings.
    pub config: StsConfig,
    /// Provider lookup tables.
    pub providers: TokenProviderRegistry,
    /// Caller admission.
    pub gate: Arc<dyn PermissionGate>,
}

impl std::fmt::Debug for StsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StsSnapshot")
            .field("sts_name", &self.config.sts_name)
            .field("providers", &self.providers)
            .finish_non_exhaustive()
    }
}

impl StsSnapshot {
    /// Builds a snapshot, creating every configured provider through the
    /// catalog.
    ///
    /// # Errors
    ///
    /// Returns [`StsError::Configuration`] for an unknown kind, a provider
    /// without keys or a duplicate key.
    pub fn build(
        config: StsConfig,
        catalog: &ProviderCatalog,
        registries: &RegistrySet,
    ) -> StsResult<Self> {
        let mut providers = TokenProviderRegistry::new();

        for registration in &config.providers {
            let provider = catalog.create(ProviderSetup {
                provider: registration,
                sts: &config,
                registries,
            })?;

            let element = match (&registration.element_ns, &registration.element_local) {
                (Some(ns), Some(local)) => Some(QName::new(ns.as_str(), local.as_str())),
                (None, None) => None,
                _ => {
                    return Err(StsError::Configuration(format!(
                        "provider '{}' needs both element_ns and element_local",
                        registration.kind
                    )))
                }
            };

            if registration.service.is_none() && registration.token_type.is_none() && element.is_none() {
                return Err(StsError::Configuration(format!(
                    "provider '{}' has no service, token type or element",
                    registration.kind
                )));
            }

            if let Some(service) = &registration.service {
                providers.register_service(service.as_str(), Arc::clone(&provider))?;
            }
            if let Some(token_type) = &registration.token_type {
                providers.register_token_type(token_type.as_str(), Arc::clone(&provider))?;
            }
            if let Some(element) = element {
                providers.register_element(registration.family(), element, Arc::clone(&provider))?;
            }
            debug!(kind = %registration.kind, provider = provider.name(), "token provider registered");
        }

        Ok(Self {
            gate: gate_from_config(&config),
            config,
            providers,
        })
    }
}

/// Dispatches STS operations to token providers.
///
/// The dispatcher is built once and shared; [`StsDispatcher::reinitialize`]
/// swaps in a new configuration atomically while calls are in flight.
pub struct StsDispatcher {
    snapshot: RwLock<Arc<StsSnapshot>>,
    catalog: ProviderCatalog,
    registries: RegistrySet,
}

impl std::fmt::Debug for StsDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StsDispatcher")
            .field("snapshot", &self.snapshot())
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

impl StsDispatcher {
    /// Creates a dispatcher from configuration.
    ///
    /// # Errors
    ///
    /// See [`StsSnapshot::build`].
    pub fn from_config(
        config: StsConfig,
        catalog: ProviderCatalog,
        registries: RegistrySet,
    ) -> StsResult<Self> {
        let snapshot = StsSnapshot::build(config, &catalog, &registries)?;
        info!(
            sts_name = %snapshot.config.sts_name,
            providers = snapshot.config.providers.len(),
            "STS initialized"
        );
        Ok(Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
            catalog,
            registries,
        })
    }

    /// Replaces the configuration. On error the old configuration stays.
    ///
    /// # Errors
    ///
    /// See [`StsSnapshot::build`].
    pub fn reinitialize(&self, config: StsConfig) -> StsResult<()> {
        let snapshot = StsSnapshot::build(config, &self.catalog, &self.registries)?;
        *self.snapshot.write() = Arc::new(snapshot);
        info!("STS configuration replaced");
        Ok(())
    }

    /// Returns the configuration currently served.
    #[must_use]
    pub fn snapshot(&self) -> Arc<StsSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Returns the registries providers work against.
    #[must_use]
    pub const fn registries(&self) -> &RegistrySet {
        &self.registries
    }

    /// Issues a token. The provider is found by service, then token type.
    ///
    /// # Errors
    ///
    /// Returns [`StsError::PermissionDenied`], [`StsError::NoProviderFound`]
    /// or a provider error.
    pub async fn issue(&self, ctx: &mut ProtocolContext) -> StsResult<Outcome> {
        self.run(Operation::Issue, ctx).await
    }

    /// Renews the token in `ctx`.
    ///
    /// # Errors
    ///
    /// See [`StsDispatcher::issue`]; [`StsError::InvalidRequest`] if `ctx`
    /// carries no token.
    pub async fn renew(&self, ctx: &mut ProtocolContext) -> StsResult<Outcome> {
        self.run(Operation::Renew, ctx).await
    }

    /// Cancels the token in `ctx`.
    ///
    /// # Errors
    ///
    /// See [`StsDispatcher::renew`].
    pub async fn cancel(&self, ctx: &mut ProtocolContext) -> StsResult<Outcome> {
        self.run(Operation::Cancel, ctx).await
    }

    /// Validates the token in `ctx`.
    ///
    /// # Errors
    ///
    /// See [`StsDispatcher::renew`].
    pub async fn validate(&self, ctx: &mut ProtocolContext) -> StsResult<Outcome> {
        self.run(Operation::Validate, ctx).await
    }

    /// Runs whichever operation `ctx` names.
    ///
    /// # Errors
    ///
    /// See the per-operation methods.
    pub async fn dispatch(&self, ctx: &mut ProtocolContext) -> StsResult<Outcome> {
        self.run(ctx.operation, ctx).await
    }

    /// Runs the permission gate alone.
    ///
    /// # Errors
    ///
    /// Returns [`StsError::PermissionDenied`] if `principal` may not run
    /// `operation`.
    pub fn authorize(&self, principal: Option<&str>, operation: Operation) -> StsResult<()> {
        Self::admit(&self.snapshot(), principal, operation)
    }

    fn admit(snapshot: &StsSnapshot, principal: Option<&str>, operation: Operation) -> StsResult<()> {
        if snapshot.gate.permits(principal, operation) {
            Ok(())
        } else {
            warn!(%operation, "STS call refused by permission gate");
            Err(StsError::PermissionDenied)
        }
    }

    #[instrument(skip(self, ctx), fields(principal = ctx.principal.as_deref().unwrap_or("-")))]
    async fn run(&self, operation: Operation, ctx: &mut ProtocolContext) -> StsResult<Outcome> {
        let snapshot = self.snapshot();
        Self::admit(&snapshot, ctx.principal.as_deref(), operation)?;

        ctx.operation = operation;
        ctx.outcome = None;
        let provider = Self::resolve(&snapshot, operation, ctx)?;
        debug!(%operation, provider = provider.name(), "dispatching STS operation");

        match operation {
            Operation::Issue => provider.issue(ctx).await?,
            Operation::Renew => provider.renew(ctx).await?,
            Operation::Cancel => provider.cancel(ctx).await?,
            Operation::Validate => provider.validate(ctx).await?,
        }

        ctx.outcome.clone().ok_or_else(|| {
            StsError::Processing(format!("provider '{}' left no outcome", provider.name()))
        })
    }

    fn resolve(
        snapshot: &StsSnapshot,
        operation: Operation,
        ctx: &ProtocolContext,
    ) -> StsResult<Arc<dyn TokenProvider>> {
        if operation == Operation::Issue {
            return snapshot
                .providers
                .resolve(ctx.service.as_deref(), ctx.token_type.as_deref())
                .ok_or_else(|| {
                    StsError::NoProviderFound(format!(
                        "service {:?} / token type {:?}",
                        ctx.service, ctx.token_type
                    ))
                });
        }

        let token = ctx
            .token()
            .ok_or_else(|| StsError::InvalidRequest(format!("{operation} requires a token")))?;
        // Tokens carry their type, so a provider registered without an
        // element is still reachable for its own tokens
        snapshot
            .providers
            .for_element(&token.family, &token.element)
            .or_else(|| {
                snapshot
                    .providers
                    .resolve(token.service.as_deref(), Some(token.token_type.as_str()))
            })
            .ok_or_else(|| {
                StsError::NoProviderFound(format!("element {} in family '{}'", token.element, token.family))
            })
    }
}
