//! Digest authentication middleware for the STS API.
//!
//! Nonces are scoped to the `FLDIGEST` cookie. A client without the cookie
//! gets one with its first challenge and must send it back with the
//! answering request.

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, COOKIE, SET_COOKIE, WWW_AUTHENTICATE},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use fl_auth::{DigestChallenge, DigestOutcome};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

/// Name of the cookie carrying the digest session.
pub const DIGEST_COOKIE_NAME: &str = "FLDIGEST";

/// Username established by digest authentication, placed in request
/// extensions for the STS handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal(pub String);

/// Requires digest credentials when the authenticator is configured;
/// passes requests through otherwise.
pub async fn digest_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(authenticator) = state.digest.clone() else {
        return next.run(request).await;
    };

    let existing = digest_session(request.headers());
    let session_id = existing
        .clone()
        .unwrap_or_else(fl_crypto::generate_session_id);

    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let outcome = authenticator
        .authenticate(&session_id, authorization.as_deref(), request.method().as_str())
        .await;

    match outcome {
        Ok(DigestOutcome::Authenticated(username)) => {
            request.extensions_mut().insert(AuthenticatedPrincipal(username));
            next.run(request).await
        }
        Ok(DigestOutcome::Challenge(challenge)) => {
            challenge_response(&challenge, existing.is_none().then_some(session_id.as_str()))
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

fn challenge_response(challenge: &DigestChallenge, new_session: Option<&str>) -> Response {
    let mut response = (StatusCode::UNAUTHORIZED, "Authentication required").into_response();

    match HeaderValue::from_str(&challenge.to_string()) {
        Ok(value) => {
            response.headers_mut().insert(WWW_AUTHENTICATE, value);
        }
        Err(e) => warn!(error = %e, "challenge is not a valid header value"),
    }

    if let Some(id) = new_session {
        if let Ok(cookie) = HeaderValue::from_str(&format!(
            "{DIGEST_COOKIE_NAME}={id}; Path=/; HttpOnly; SameSite=Strict"
        )) {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
    }
    response
}

fn digest_session(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(COOKIE)?.to_str().ok()?;
    value.split(';').find_map(|pair| {
        let (key, val) = pair.trim().split_once('=')?;
        (key.trim() == DIGEST_COOKIE_NAME).then(|| val.trim().to_string())
    })
}
