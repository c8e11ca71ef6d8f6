//! STS JSON API tests.

use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::common::{test_config, TestEnv, TOKEN_TYPE};

async fn call(env: &TestEnv, path: &str, body: Value) -> anyhow::Result<(StatusCode, Value)> {
    let response = env.client.post(env.url(path)).json(&body).send().await?;
    let status = response.status();
    Ok((status, response.json().await?))
}

/// Issue, check the registry, cancel, then validate.
#[tokio::test]
async fn issue_cancel_validate() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let (status, issued) = call(&env, "/sts/issue", json!({ "token_type": TOKEN_TYPE, "principal": "alice" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(issued["outcome"], "issued");
    let id = issued["token"]["id"].as_str().unwrap_or_default().to_string();
    assert!(!id.is_empty());

    let stored = env.registries.tokens.get(&id).await?;
    assert_eq!(stored.map(|t| t.id), Some(id.clone()));

    let (status, validated) = call(&env, "/sts/validate", json!({ "token_id": id })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(validated["status"]["status"], "valid");

    let (status, canceled) = call(&env, "/sts/cancel", json!({ "token_id": id })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(canceled["outcome"], "canceled");
    assert!(env.registries.revocations.is_revoked(&id).await?);

    let (_, validated) = call(&env, "/sts/validate", json!({ "token_id": id })).await?;
    assert_eq!(validated["status"]["status"], "token_revoked");
    Ok(())
}

/// Renewal replaces the token and keeps its subject.
#[tokio::test]
async fn renew_replaces_token() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let (_, issued) = call(&env, "/sts/issue", json!({ "token_type": TOKEN_TYPE, "principal": "alice" })).await?;
    let old_id = issued["token"]["id"].as_str().unwrap_or_default().to_string();

    let (status, renewed) = call(&env, "/sts/renew", json!({ "token_id": old_id })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renewed["outcome"], "renewed");
    let new_id = renewed["token"]["id"].as_str().unwrap_or_default();
    assert_ne!(new_id, old_id);
    assert!(renewed["token"]["payload"].as_str().unwrap_or_default().contains("alice"));

    assert!(env.registries.tokens.get(&old_id).await?.is_none());
    assert!(env.registries.tokens.get(new_id).await?.is_some());
    Ok(())
}

/// Unknown token types and token IDs are reported as not found.
#[tokio::test]
async fn unknown_keys_are_not_found() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let (status, body) = call(&env, "/sts/issue", json!({ "token_type": "urn:unknown" })).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "no_provider");

    let (status, body) = call(&env, "/sts/validate", json!({ "token_id": "_nope" })).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "token_not_found");
    Ok(())
}

/// An allow-list without digest authentication would trust the principal
/// named in the request body, so the server refuses to start with it.
#[tokio::test]
async fn allow_list_without_digest_is_refused() -> anyhow::Result<()> {
    let mut config = test_config();
    config.sts.allowed_principals = Some(vec!["svc".to_string()]);
    assert!(TestEnv::with_config(config).await.is_err());
    Ok(())
}
