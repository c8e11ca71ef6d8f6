//! Digest-guarded STS API tests.

use fl_auth::{DigestAlgorithm, DigestCredentials, PasswordDigestValidator};
use fl_core::Config;
use reqwest::header::{AUTHORIZATION, COOKIE, WWW_AUTHENTICATE};
use reqwest::StatusCode;
use serde_json::json;

use crate::common::{cookie_of, test_config, TestEnv, TOKEN_TYPE};

/// Digest enabled with the default `[digest]` settings apart from users.
fn digest_config() -> Config {
    let mut config = test_config();
    config.digest.enabled = true;
    config.digest.users.insert("svc".to_string(), "secret".to_string());
    config.digest.users.insert("ops".to_string(), "hunter2".to_string());
    config.sts.allowed_principals = Some(vec!["svc".to_string()]);
    config
}

async fn digest_env() -> anyhow::Result<TestEnv> {
    TestEnv::with_config(digest_config()).await
}

fn challenge_of(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn nonce_of(challenge: &str) -> String {
    let start = challenge.find("nonce=\"").map_or(0, |i| i + 7);
    let len = challenge[start..].find('"').unwrap_or(0);
    challenge[start..start + len].to_string()
}

fn authorization(nonce: &str, password: &str) -> String {
    authorization_as(DigestAlgorithm::Md5, "svc", nonce, password)
}

fn authorization_as(algorithm: DigestAlgorithm, user: &str, nonce: &str, password: &str) -> String {
    let credentials = DigestCredentials {
        username: user.to_string(),
        realm: "ferrolink".to_string(),
        nonce: nonce.to_string(),
        uri: "/sts/issue".to_string(),
        qop: Some("auth".to_string()),
        nc: Some("00000001".to_string()),
        cnonce: Some("0a4f113b".to_string()),
        response: String::new(),
        opaque: None,
        algorithm: Some(algorithm.to_string()),
    };
    let response = PasswordDigestValidator::expected_response(algorithm, &credentials, password, "POST");
    format!(
        r#"Digest username="{user}", realm="ferrolink", nonce="{nonce}", uri="/sts/issue", algorithm={algorithm}, qop=auth, nc=00000001, cnonce="0a4f113b", response="{response}""#
    )
}

/// An unauthenticated call is challenged; answering it issues a token to
/// the authenticated user.
#[tokio::test]
async fn challenge_then_answer() -> anyhow::Result<()> {
    let env = digest_env().await?;
    let body = json!({ "token_type": TOKEN_TYPE, "principal": "mallory" });

    let response = env.client.post(env.url("/sts/issue")).json(&body).send().await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let cookie = cookie_of(&response).unwrap_or_default();
    assert!(cookie.starts_with("FLDIGEST="));
    let challenge = challenge_of(&response);
    assert!(challenge.starts_with(r#"Digest realm="ferrolink",domain="/",nonce=""#));
    assert!(challenge.ends_with(r#"algorithm=MD5,qop=auth,stale="false""#));

    let nonce = nonce_of(&challenge);
    let response = env
        .client
        .post(env.url("/sts/issue"))
        .header(COOKIE, &cookie)
        .header(AUTHORIZATION, authorization(&nonce, "secret"))
        .json(&body)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let issued: serde_json::Value = response.json().await?;
    assert!(issued["token"]["payload"].as_str().unwrap_or_default().contains(">svc<"));
    Ok(())
}

/// Wrong passwords and nonces from another session are challenged again.
#[tokio::test]
async fn bad_credentials_are_challenged() -> anyhow::Result<()> {
    let env = digest_env().await?;
    let body = json!({ "token_type": TOKEN_TYPE });

    let response = env.client.post(env.url("/sts/issue")).json(&body).send().await?;
    let cookie = cookie_of(&response).unwrap_or_default();
    let nonce = nonce_of(&challenge_of(&response));

    let response = env
        .client
        .post(env.url("/sts/issue"))
        .header(COOKIE, &cookie)
        .header(AUTHORIZATION, authorization(&nonce, "guess"))
        .json(&body)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = env
        .client
        .post(env.url("/sts/issue"))
        .header(COOKIE, "FLDIGEST=someone-else")
        .header(AUTHORIZATION, authorization(&nonce, "secret"))
        .json(&body)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(env.registries.tokens.is_empty().await?);
    Ok(())
}

/// The SP endpoints are not behind the digest guard.
#[tokio::test]
async fn sp_routes_are_not_guarded() -> anyhow::Result<()> {
    let env = digest_env().await?;
    let response = env.client.get(env.url("/saml/sp/login")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

/// A server configured for `SHA-256` advertises it and accepts answers
/// computed with it.
#[tokio::test]
async fn sha256_is_advertised_and_accepted() -> anyhow::Result<()> {
    let mut config = digest_config();
    config.digest.algorithm = DigestAlgorithm::Sha256;
    let env = TestEnv::with_config(config).await?;
    let body = json!({ "token_type": TOKEN_TYPE });

    let response = env.client.post(env.url("/sts/issue")).json(&body).send().await?;
    let cookie = cookie_of(&response).unwrap_or_default();
    let challenge = challenge_of(&response);
    assert!(challenge.contains("algorithm=SHA-256,"));

    let nonce = nonce_of(&challenge);
    let response = env
        .client
        .post(env.url("/sts/issue"))
        .header(COOKIE, &cookie)
        .header(AUTHORIZATION, authorization_as(DigestAlgorithm::Sha256, "svc", &nonce, "secret"))
        .json(&body)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

/// An authenticated caller outside the allow-list cannot borrow an allowed
/// name through the request body.
#[tokio::test]
async fn body_principal_does_not_pass_the_allow_list() -> anyhow::Result<()> {
    let env = digest_env().await?;
    let body = json!({ "token_type": TOKEN_TYPE, "principal": "svc" });

    let response = env.client.post(env.url("/sts/issue")).json(&body).send().await?;
    let cookie = cookie_of(&response).unwrap_or_default();
    let nonce = nonce_of(&challenge_of(&response));

    let response = env
        .client
        .post(env.url("/sts/issue"))
        .header(COOKIE, &cookie)
        .header(AUTHORIZATION, authorization_as(DigestAlgorithm::Md5, "ops", &nonce, "hunter2"))
        .json(&body)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let error: serde_json::Value = response.json().await?;
    assert_eq!(error["error"], "access_denied");
    assert!(env.registries.tokens.is_empty().await?);
    Ok(())
}
