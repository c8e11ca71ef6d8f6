//! SP router.

use axum::{routing::get, Router};

use super::sp::{sp_get, sp_login, sp_logout, sp_post};
use super::state::SpState;

/// Creates the service-provider router.
///
/// | Method | Path             | Description                               |
/// |--------|------------------|-------------------------------------------|
/// | GET    | `/saml/sp`       | Redirect binding, `GLO=true`, status page |
/// | POST   | `/saml/sp`       | POST binding                              |
/// | GET    | `/saml/sp/login` | Start browser SSO                         |
/// | GET    | `/saml/sp/logout`| Start single logout                       |
pub fn sp_router() -> Router<SpState> {
    Router::new()
        .route("/saml/sp", get(sp_get).post(sp_post))
        .route("/saml/sp/login", get(sp_login))
        .route("/saml/sp/logout", get(sp_logout))
}
