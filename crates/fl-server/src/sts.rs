//! STS JSON endpoints.
//!
//! | Method | Path            | Body                                   |
//! |--------|-----------------|----------------------------------------|
//! | POST   | `/sts/issue`    | `{service?, token_type?, principal?}`  |
//! | POST   | `/sts/renew`    | `{token_id}`                           |
//! | POST   | `/sts/cancel`   | `{token_id}`                           |
//! | POST   | `/sts/validate` | `{token_id}`                           |
//!
//! When digest authentication is enabled the authenticated username is the
//! calling principal and any `principal` in the body is ignored.

use axum::{extract::State, http::StatusCode, Extension, Json};
use fl_core::Token;
use fl_sts::{Operation, Outcome, ProtocolContext, ValidationStatus};
use serde::{Deserialize, Serialize};

use crate::digest::AuthenticatedPrincipal;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Body of `POST /sts/issue`.
#[derive(Debug, Default, Deserialize)]
pub struct IssueRequest {
    /// Relying service the token is for.
    pub service: Option<String>,
    /// Requested token type.
    pub token_type: Option<String>,
    /// Subject to issue for, when the call is not authenticated.
    pub principal: Option<String>,
}

/// Body of the renew, cancel and validate calls.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    /// ID of a token in the registry.
    pub token_id: String,
}

/// Response of every STS call.
#[derive(Debug, Serialize, Deserialize)]
pub struct StsResponse {
    /// `issued`, `renewed`, `canceled`, `validated` or `refused`.
    pub outcome: String,
    /// Issued or renewed token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<Token>,
    /// Validation result, or why the call was refused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ValidationStatus>,
}

/// Maps a dispatcher outcome to a response. A refusal is a 409.
fn reply(outcome: Outcome) -> (StatusCode, Json<StsResponse>) {
    let (status, outcome, token, validation) = match outcome {
        Outcome::Issued(token) => (StatusCode::OK, "issued", Some(token), None),
        Outcome::Renewed(token) => (StatusCode::OK, "renewed", Some(token), None),
        Outcome::Canceled => (StatusCode::OK, "canceled", None, None),
        Outcome::Validated(status) => (StatusCode::OK, "validated", None, Some(status)),
        Outcome::Refused(status) => (StatusCode::CONFLICT, "refused", None, Some(status)),
    };
    (
        status,
        Json(StsResponse {
            outcome: outcome.to_string(),
            token,
            status: validation,
        }),
    )
}

type StsReply = ApiResult<(StatusCode, Json<StsResponse>)>;

/// `POST /sts/issue`.
pub async fn issue(
    State(state): State<AppState>,
    principal: Option<Extension<AuthenticatedPrincipal>>,
    Json(body): Json<IssueRequest>,
) -> StsReply {
    let mut ctx = ProtocolContext::issue();
    ctx.service = body.service;
    ctx.token_type = body.token_type;
    ctx.principal = caller(principal, body.principal);

    Ok(reply(state.sts.issue(&mut ctx).await?))
}

/// `POST /sts/renew`.
pub async fn renew(
    State(state): State<AppState>,
    principal: Option<Extension<AuthenticatedPrincipal>>,
    Json(body): Json<TokenRequest>,
) -> StsReply {
    token_call(&state, Operation::Renew, caller(principal, None), &body.token_id).await
}

/// `POST /sts/cancel`.
pub async fn cancel(
    State(state): State<AppState>,
    principal: Option<Extension<AuthenticatedPrincipal>>,
    Json(body): Json<TokenRequest>,
) -> StsReply {
    token_call(&state, Operation::Cancel, caller(principal, None), &body.token_id).await
}

/// `POST /sts/validate`.
pub async fn validate(
    State(state): State<AppState>,
    principal: Option<Extension<AuthenticatedPrincipal>>,
    Json(body): Json<TokenRequest>,
) -> StsReply {
    token_call(&state, Operation::Validate, caller(principal, None), &body.token_id).await
}

fn caller(
    authenticated: Option<Extension<AuthenticatedPrincipal>>,
    claimed: Option<String>,
) -> Option<String> {
    match authenticated {
        Some(Extension(AuthenticatedPrincipal(name))) => Some(name),
        None => claimed,
    }
}

/// Runs a token-bearing operation on the registered token `token_id`.
///
/// The caller is authorized before any lookup so a refused caller learns
/// nothing about which IDs exist. Canceling removes a token from the token
/// registry but its ID stays revoked, so a miss is answered from the
/// revocation registry before it becomes a 404.
async fn token_call(
    state: &AppState,
    operation: Operation,
    principal: Option<String>,
    token_id: &str,
) -> StsReply {
    state.sts.authorize(principal.as_deref(), operation)?;
    let registries = state.sts.registries();

    let Some(token) = registries.tokens.get(token_id).await? else {
        if !registries.revocations.is_revoked(token_id).await? {
            return Err(ApiError::TokenNotFound(token_id.to_string()));
        }
        let outcome = match operation {
            Operation::Cancel => Outcome::Canceled,
            Operation::Renew => Outcome::Refused(ValidationStatus::TokenRevoked),
            Operation::Issue | Operation::Validate => Outcome::Validated(ValidationStatus::TokenRevoked),
        };
        return Ok(reply(outcome));
    };

    let mut ctx = ProtocolContext::validate(token);
    ctx.operation = operation;
    ctx.principal = principal;
    Ok(reply(state.sts.dispatch(&mut ctx).await?))
}

#[cfg(test)]
mod tests {
    use fl_core::config::ProviderConfig;
    use fl_core::Config;
    use fl_registry::RegistrySet;
    use fl_sts::StsError;

    use super::*;

    fn guarded_state() -> AppState {
        let mut config = Config::for_testing();
        config.digest.enabled = true;
        config.sts.allowed_principals = Some(vec!["svc".to_string()]);
        config.sts.providers.push(ProviderConfig {
            kind: "saml2".to_string(),
            token_type: Some("urn:x".to_string()),
            ..ProviderConfig::default()
        });
        AppState::build(config, RegistrySet::memory()).unwrap()
    }

    fn as_caller(name: &str) -> Option<Extension<AuthenticatedPrincipal>> {
        Some(Extension(AuthenticatedPrincipal(name.to_string())))
    }

    #[tokio::test]
    async fn refused_caller_learns_nothing_about_token_ids() {
        let state = guarded_state();
        let request = || Json(TokenRequest {
            token_id: "_missing".to_string(),
        });

        let result = validate(State(state.clone()), as_caller("mallory"), request()).await;
        assert!(matches!(result, Err(ApiError::Sts(StsError::PermissionDenied))));

        let result = validate(State(state), as_caller("svc"), request()).await;
        assert!(matches!(result, Err(ApiError::TokenNotFound(_))));
    }
}
