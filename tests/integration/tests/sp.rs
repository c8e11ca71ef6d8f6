//! SAML service-provider endpoint tests.

use base64::Engine;
use chrono::{Duration, Utc};
use fl_protocol_saml::bindings::form_field;
use fl_protocol_saml::{Assertion, Conditions, Response as SamlResponse};
use reqwest::header::{COOKIE, LOCATION};
use reqwest::StatusCode;

use crate::common::{cookie_of, test_config, TestEnv};

fn encoded_response(subject: &str) -> String {
    let now = Utc::now();
    let assertion = Assertion::new("_a1", "https://idp.example.com")
        .with_subject(subject)
        .with_session_index("idx-1")
        .with_conditions(Conditions::new(now - Duration::minutes(1), now + Duration::minutes(5)));
    let xml = SamlResponse::success("https://idp.example.com")
        .with_assertion(assertion)
        .to_xml();
    base64::engine::general_purpose::STANDARD.encode(xml)
}

/// Login form, IdP response, then global logout.
#[tokio::test]
async fn login_then_global_logout() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env.client.get(env.url("/saml/sp/login")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = cookie_of(&response).unwrap_or_default();
    assert!(cookie.starts_with("FLSESSION="));
    let html = response.text().await?;
    assert!(html.contains(r#"action="https://idp.example.com/sso""#));
    assert!(form_field(&html, "SAMLRequest").is_some());

    let response = env
        .client
        .post(env.url("/saml/sp"))
        .header(COOKIE, &cookie)
        .form(&[("SAMLResponse", encoded_response("alice"))])
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await?.contains("Signed in as alice."));

    let response = env
        .client
        .get(env.url("/saml/sp?GLO=true"))
        .header(COOKIE, &cookie)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await?;
    assert!(html.contains(r#"action="https://idp.example.com/slo""#));
    assert!(form_field(&html, "SAMLRequest").is_some());
    Ok(())
}

/// A replayed response is refused.
#[tokio::test]
async fn replayed_response_is_forbidden() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let encoded = encoded_response("alice");

    let first = env
        .client
        .post(env.url("/saml/sp"))
        .form(&[("SAMLResponse", encoded.as_str())])
        .send()
        .await?;
    assert_eq!(first.status(), StatusCode::OK);

    let replay = env
        .client
        .post(env.url("/saml/sp"))
        .form(&[("SAMLResponse", encoded.as_str())])
        .send()
        .await?;
    assert_eq!(replay.status(), StatusCode::FORBIDDEN);
    Ok(())
}

/// Global logout without a signed-in session is refused.
#[tokio::test]
async fn glo_without_session_is_forbidden() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let response = env.client.get(env.url("/saml/sp?GLO=true")).send().await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().get(LOCATION).is_none());
    Ok(())
}

/// Sessions left idle are dropped by the server's background pruner.
#[tokio::test]
async fn idle_sessions_are_pruned() -> anyhow::Result<()> {
    let mut config = test_config();
    config.sp.session_idle_secs = 0;
    config.sp.session_prune_interval_secs = 1;
    let env = TestEnv::with_config(config).await?;

    let response = env.client.get(env.url("/saml/sp/login")).send().await?;
    let cookie = cookie_of(&response).unwrap_or_default();
    assert!(cookie.starts_with("FLSESSION="));

    tokio::time::sleep(std::time::Duration::from_millis(2500)).await;
    assert_eq!(env.sp.session_count(), 0);

    // The old cookie no longer names a session
    let response = env.client.get(env.url("/saml/sp")).header(COOKIE, &cookie).send().await?;
    assert!(cookie_of(&response).is_some_and(|fresh| fresh != cookie));
    Ok(())
}
