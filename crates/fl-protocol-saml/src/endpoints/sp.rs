//! SP endpoint handlers.
//!
//! Each browser is tied to an [`SpSession`] by the `FLSESSION` cookie; a
//! request without a known cookie gets a fresh session and a `Set-Cookie`.

use axum::{
    extract::{Query, RawQuery, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tracing::warn;

use crate::bindings::SamlParams;
use crate::error::{SamlError, SamlResult};
use crate::handler::RequestKind;
use crate::session::SpSession;
use crate::sp::SpOutcome;
use crate::xml::escape;

use super::state::SpState;

/// Name of the SP session cookie.
pub const SESSION_COOKIE_NAME: &str = "FLSESSION";

/// Query parameters of the login and logout entry points.
#[derive(Debug, Default, Deserialize)]
pub struct StartParams {
    /// Where to return the browser once the exchange completes.
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,
}

/// GET handler for the SP endpoint (HTTP-Redirect binding and `GLO`).
///
/// Without a message, an unauthenticated browser is sent to the IdP and an
/// authenticated one gets a status page.
pub async fn sp_get(
    State(state): State<SpState>,
    headers: HeaderMap,
    RawQuery(raw_query): RawQuery,
    Query(mut params): Query<SamlParams>,
) -> Response {
    params.raw_query = raw_query;
    let (id, session, created) = state.session(session_id(&headers).as_deref());

    let result = if params.has_message() || params.is_global_logout() {
        state.processor.process_inbound(&params, &session)
    } else if session.is_authenticated() {
        Ok(SpOutcome::Done)
    } else {
        state
            .processor
            .originate(RequestKind::Authentication, &session, params.relay_state)
    };

    respond(result, &session, created.then_some(id.as_str()))
}

/// POST handler for the SP endpoint (HTTP-POST binding).
pub async fn sp_post(
    State(state): State<SpState>,
    headers: HeaderMap,
    Form(params): Form<SamlParams>,
) -> Response {
    let (id, session, created) = state.session(session_id(&headers).as_deref());
    let result = state.processor.process_inbound(&params, &session);
    respond(result, &session, created.then_some(id.as_str()))
}

/// Starts browser SSO.
pub async fn sp_login(
    State(state): State<SpState>,
    headers: HeaderMap,
    Query(params): Query<StartParams>,
) -> Response {
    let (id, session, created) = state.session(session_id(&headers).as_deref());
    let result = state
        .processor
        .originate(RequestKind::Authentication, &session, params.relay_state);
    respond(result, &session, created.then_some(id.as_str()))
}

/// Starts single logout.
pub async fn sp_logout(
    State(state): State<SpState>,
    headers: HeaderMap,
    Query(params): Query<StartParams>,
) -> Response {
    let (id, session, created) = state.session(session_id(&headers).as_deref());
    let result = state
        .processor
        .originate(RequestKind::Logout, &session, params.relay_state);
    respond(result, &session, created.then_some(id.as_str()))
}

fn respond(result: SamlResult<SpOutcome>, session: &SpSession, new_session: Option<&str>) -> Response {
    let mut response = match result {
        Ok(SpOutcome::PostForm(html)) => Html(html).into_response(),
        Ok(SpOutcome::Redirect(url)) => Redirect::to(&url).into_response(),
        Ok(SpOutcome::Error { status, message }) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Html(error_page(&message))).into_response()
        }
        Ok(SpOutcome::Done) => Html(status_page(session)).into_response(),
        Err(e) => {
            warn!(error = %e, "SP request failed");
            error_response(&e).into_response()
        }
    };

    if let Some(id) = new_session {
        if let Ok(cookie) = session_cookie(id) {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
    }
    response
}

fn session_cookie(id: &str) -> Result<HeaderValue, axum::http::header::InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE_NAME}={id}; Path=/; HttpOnly; SameSite=Lax"
    ))
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(COOKIE)?.to_str().ok()?;
    value.split(';').find_map(|pair| {
        let (key, val) = pair.trim().split_once('=')?;
        (key.trim() == SESSION_COOKIE_NAME).then(|| val.trim().to_string())
    })
}

fn status_page(session: &SpSession) -> String {
    let body = match session.principal() {
        Some(principal) => format!("<p>Signed in as {}.</p>", escape(&principal)),
        None => "<p>You are signed out.</p>".to_string(),
    };
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Service Provider</title>
</head>
<body>
    {body}
</body>
</html>"#
    )
}

fn error_page(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>SAML Error</title></head>
<body>
<h1>SAML Error</h1>
<p>{}</p>
</body>
</html>"#,
        escape(message)
    )
}

/// Creates an error response.
fn error_response(err: &SamlError) -> (StatusCode, Html<String>) {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Html(error_page(&err.to_string())))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header::LOCATION, Request};
    use axum::Router;
    use base64::Engine;
    use fl_core::config::{Binding, ServiceProviderConfig};
    use tower::ServiceExt;

    use super::*;
    use crate::endpoints::sp_router;
    use crate::sp::ServiceProviderProcessor;
    use crate::types::LogoutRequest;

    fn app(binding: Binding) -> (Router, SpState) {
        let config = ServiceProviderConfig {
            identity_url: "https://idp.example.com/sso".to_string(),
            logout_url: Some("https://idp.example.com/slo".to_string()),
            binding,
            ..ServiceProviderConfig::default()
        };
        let processor = ServiceProviderProcessor::from_config(config).unwrap();
        let state = SpState::new(Arc::new(processor));
        (sp_router().with_state(state.clone()), state)
    }

    fn cookie_of(response: &Response) -> String {
        let header = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        header.split(';').next().unwrap().to_string()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("a=1; FLSESSION=abc ; b=2"));
        assert_eq!(session_id(&headers).as_deref(), Some("abc"));
        assert_eq!(session_id(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn login_redirects_and_sets_cookie() {
        let (app, state) = app(Binding::Redirect);

        let response = app
            .oneshot(Request::get("/saml/sp/login?RelayState=%2Fapp").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers().get(LOCATION).unwrap().to_str().unwrap();
        assert!(location.starts_with("https://idp.example.com/sso?SAMLRequest="));
        assert!(location.contains("RelayState=%2Fapp"));
        assert!(cookie_of(&response).starts_with("FLSESSION="));
        assert_eq!(state.session_count(), 1);
    }

    #[tokio::test]
    async fn glo_on_unauthenticated_session_is_forbidden() {
        let (app, _) = app(Binding::Redirect);
        let response = app
            .oneshot(Request::get("/saml/sp?GLO=true").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn malformed_post_is_a_bad_request() {
        let (app, _) = app(Binding::Post);
        let response = app
            .oneshot(
                Request::post("/saml/sp")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("SAMLResponse=%25%25%25"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn idp_logout_request_is_answered_with_a_form() {
        let (app, state) = app(Binding::Post);
        let (id, session, _) = state.session(None);
        session.authenticate("alice", Vec::new(), None);

        let xml = LogoutRequest::new("https://idp.example.com", "alice").to_xml();
        let encoded = base64::engine::general_purpose::STANDARD.encode(xml);
        let body = format!("SAMLRequest={}", urlencoding::encode(&encoded));

        let response = app
            .oneshot(
                Request::post("/saml/sp")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .header(COOKIE, format!("{SESSION_COOKIE_NAME}={id}"))
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_none());
        let html = body_text(response).await;
        assert!(html.contains(r#"name="SAMLResponse""#));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn authenticated_session_gets_status_page() {
        let (app, state) = app(Binding::Post);
        let (id, session, _) = state.session(None);
        session.authenticate("alice", Vec::new(), None);

        let response = app
            .oneshot(
                Request::get("/saml/sp")
                    .header(COOKIE, format!("{SESSION_COOKIE_NAME}={id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Signed in as alice."));
    }
}
