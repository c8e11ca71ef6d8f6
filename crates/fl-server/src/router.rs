//! Router configuration.
//!
//! | Path                   | Served by                         |
//! |------------------------|-----------------------------------|
//! | `/saml/sp/*`           | SAML service-provider endpoints   |
//! | `/sts/*`               | STS JSON API (digest-guarded)     |
//! | `/health`, `/health/*` | health probes                     |

use axum::{http::StatusCode, middleware, response::Json, routing::get, routing::post, Router};
use fl_protocol_saml::endpoints::sp_router;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::digest::digest_middleware;
use crate::state::AppState;
use crate::sts;

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let sp = sp_router().with_state(state.sp.clone());

    let sts = Router::new()
        .route("/sts/issue", post(sts::issue))
        .route("/sts/renew", post(sts::renew))
        .route("/sts/cancel", post(sts::cancel))
        .route("/sts/validate", post(sts::validate))
        .route_layer(middleware::from_fn_with_state(state.clone(), digest_middleware))
        .with_state(state);

    let health = Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(sp)
        .merge(sts)
        .merge(health)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `healthy` while the process serves requests.
    pub status: String,
    /// Server version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    })
}

async fn liveness_check() -> StatusCode {
    StatusCode::OK
}
