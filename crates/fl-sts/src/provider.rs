//! Token provider contract.

use async_trait::async_trait;

use crate::context::ProtocolContext;
use crate::error::StsResult;

/// Lifecycle implementation for one kind of security token.
///
/// Each entry point reads the request from the context and leaves its
/// [`crate::Outcome`] in `ctx.outcome`. A provider that cancels a token
/// must revoke it before returning; renew and validate must consult the
/// revocation registry first.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Issues a new token.
    async fn issue(&self, ctx: &mut ProtocolContext) -> StsResult<()>;

    /// Renews the token in `ctx`.
    async fn renew(&self, ctx: &mut ProtocolContext) -> StsResult<()>;

    /// Cancels the token in `ctx`.
    async fn cancel(&self, ctx: &mut ProtocolContext) -> StsResult<()>;

    /// Validates the token in `ctx`.
    async fn validate(&self, ctx: &mut ProtocolContext) -> StsResult<()>;
}
