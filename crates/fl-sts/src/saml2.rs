//! SAML 2.0 assertion tokens.
//!
//! Recognized provider properties:
//!
//! | Property       | Meaning                                   |
//! |----------------|-------------------------------------------|
//! | `TokenTimeout` | Lifetime in seconds (overrides the STS)   |
//! | `ClockSkew`    | Skew in milliseconds (overrides the STS)  |
//! | `Subject`      | Subject used when the caller is anonymous |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fl_core::{QName, Token};
use fl_protocol_saml::{validator, Assertion, Conditions, SAML_NS};
use fl_registry::RegistrySet;
use tracing::{debug, info, instrument};

use crate::catalog::{ProviderFactory, ProviderSetup};
use crate::context::{Outcome, ProtocolContext, ValidationStatus};
use crate::error::{StsError, StsResult};
use crate::provider::TokenProvider;

/// Token type URI of SAML 2.0 assertions.
pub const SAML2_TOKEN_TYPE: &str =
    "http://docs.oasis-open.org/wss/oasis-wss-saml-token-profile-1.1#SAMLV2.0";

/// Subject of tokens issued to anonymous callers.
pub const ANONYMOUS_SUBJECT: &str = "ANONYMOUS";

/// Factory for the `saml2` provider kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct Saml2ProviderFactory;

impl Saml2ProviderFactory {
    /// Kind name in configuration.
    pub const KIND: &'static str = "saml2";
}

impl ProviderFactory for Saml2ProviderFactory {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn create(&self, setup: ProviderSetup<'_>) -> StsResult<Arc<dyn TokenProvider>> {
        Ok(Arc::new(Saml2TokenProvider::from_setup(setup)?))
    }
}

/// Issues and manages SAML 2.0 assertions.
#[derive(Debug)]
pub struct Saml2TokenProvider {
    issuer: String,
    token_timeout_secs: u64,
    skew_millis: u64,
    subject: Option<String>,
    token_type: String,
    family: String,
    element: QName,
    registries: RegistrySet,
}

impl Saml2TokenProvider {
    /// Builds a provider from its registration.
    ///
    /// # Errors
    ///
    /// Returns [`StsError::Configuration`] if a numeric property does not
    /// parse.
    pub fn from_setup(setup: ProviderSetup<'_>) -> StsResult<Self> {
        let provider = setup.provider;
        let properties = &provider.properties;

        let token_timeout_secs = match properties.get("TokenTimeout") {
            Some(value) => parse_number("TokenTimeout", value)?,
            None => setup.sts.token_timeout_secs,
        };
        let skew_millis = match properties.get("ClockSkew") {
            Some(value) => parse_number("ClockSkew", value)?,
            None => setup.sts.clock_skew_millis,
        };

        let element = QName::new(
            provider.element_ns.as_deref().unwrap_or(SAML_NS),
            provider.element_local.as_deref().unwrap_or("Assertion"),
        );

        Ok(Self {
            issuer: setup.sts.sts_name.clone(),
            token_timeout_secs,
            skew_millis,
            subject: properties.get("Subject").cloned(),
            token_type: provider
                .token_type
                .clone()
                .unwrap_or_else(|| SAML2_TOKEN_TYPE.to_string()),
            family: provider.family().to_string(),
            element,
            registries: setup.registries.clone(),
        })
    }

    /// Lifetime window for a token minted at `now`.
    fn window(&self, now: DateTime<Utc>) -> Conditions {
        let not_on_or_after = validator::add(
            now,
            self.token_timeout_secs.saturating_mul(1000).saturating_add(self.skew_millis),
        );
        Conditions::new(validator::subtract(now, self.skew_millis), not_on_or_after)
    }

    fn token(&self, assertion: &Assertion, token_type: String, service: Option<String>) -> Token {
        let conditions = assertion.conditions.unwrap_or_default();
        Token {
            id: assertion.id.clone(),
            token_type,
            service,
            family: self.family.clone(),
            element: self.element.clone(),
            payload: assertion.to_xml(),
            created: conditions.not_before.unwrap_or(assertion.issue_instant),
            expires: conditions.not_on_or_after,
        }
    }

    fn require_token(ctx: &ProtocolContext) -> StsResult<Token> {
        ctx.token()
            .cloned()
            .ok_or_else(|| StsError::InvalidRequest(format!("{} requires a token", ctx.operation)))
    }
}

fn parse_number(name: &str, value: &str) -> StsResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|e| StsError::Configuration(format!("{name} must be a number, got '{value}': {e}")))
}

#[async_trait]
impl TokenProvider for Saml2TokenProvider {
    fn name(&self) -> &str {
        Saml2ProviderFactory::KIND
    }

    #[instrument(skip(self, ctx), fields(service = ctx.service.as_deref().unwrap_or("-")))]
    async fn issue(&self, ctx: &mut ProtocolContext) -> StsResult<()> {
        let now = Utc::now();
        let subject = ctx
            .principal
            .as_deref()
            .or(self.subject.as_deref())
            .unwrap_or(ANONYMOUS_SUBJECT);

        let assertion = Assertion::new(fl_crypto::generate_token_id(), self.issuer.as_str())
            .issued_at(now)
            .with_subject(subject)
            .with_conditions(self.window(now));

        let token_type = ctx.token_type.clone().unwrap_or_else(|| self.token_type.clone());
        let token = self.token(&assertion, token_type, ctx.service.clone());
        self.registries.tokens.put(&token.id, &token).await?;

        info!(token_id = %token.id, subject, "SAML 2.0 token issued");
        ctx.outcome = Some(Outcome::Issued(token));
        Ok(())
    }

    #[instrument(skip(self, ctx))]
    async fn renew(&self, ctx: &mut ProtocolContext) -> StsResult<()> {
        let old = Self::require_token(ctx)?;

        if self.registries.revocations.is_revoked(&old.id).await? {
            debug!(token_id = %old.id, "refusing to renew a revoked token");
            ctx.outcome = Some(Outcome::Refused(ValidationStatus::TokenRevoked));
            return Ok(());
        }

        let previous = Assertion::from_xml(&old.payload)?;
        let now = Utc::now();
        let mut renewed = Assertion::new(fl_crypto::generate_token_id(), self.issuer.as_str())
            .issued_at(now)
            .with_conditions(self.window(now));
        renewed.subject = previous.subject;
        renewed.session_index = previous.session_index;
        renewed.roles = previous.roles;

        let token = self.token(&renewed, old.token_type.clone(), old.service.clone());
        self.registries.tokens.remove(&old.id).await?;
        self.registries.tokens.put(&token.id, &token).await?;

        info!(old_id = %old.id, token_id = %token.id, "SAML 2.0 token renewed");
        ctx.outcome = Some(Outcome::Renewed(token));
        Ok(())
    }

    #[instrument(skip(self, ctx))]
    async fn cancel(&self, ctx: &mut ProtocolContext) -> StsResult<()> {
        let token = Self::require_token(ctx)?;

        self.registries.revocations.revoke(&token.id).await?;
        self.registries.tokens.remove(&token.id).await?;

        info!(token_id = %token.id, "SAML 2.0 token canceled");
        ctx.outcome = Some(Outcome::Canceled);
        Ok(())
    }

    #[instrument(skip(self, ctx))]
    async fn validate(&self, ctx: &mut ProtocolContext) -> StsResult<()> {
        let token = Self::require_token(ctx)?;

        let status = if self.registries.revocations.is_revoked(&token.id).await? {
            ValidationStatus::TokenRevoked
        } else {
            match Assertion::from_xml(&token.payload) {
                Err(e) => ValidationStatus::Invalid(e.to_string()),
                Ok(assertion) => {
                    match validator::is_valid(assertion.conditions.as_ref(), Utc::now(), self.skew_millis) {
                        Ok(true) => ValidationStatus::Valid,
                        Ok(false) => ValidationStatus::AssertionExpired,
                        Err(e) => ValidationStatus::Invalid(e.to_string()),
                    }
                }
            }
        };

        debug!(token_id = %token.id, ?status, "SAML 2.0 token validated");
        ctx.outcome = Some(Outcome::Validated(status));
        Ok(())
    }
}
