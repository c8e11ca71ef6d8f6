//! STS API error types.
//!
//! Maps dispatcher and authentication failures to JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fl_auth::AuthError;
use fl_registry::RegistryError;
use fl_sts::StsError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Errors returned by the STS JSON API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The referenced token is not in the registry.
    #[error("token not found: {0}")]
    TokenNotFound(String),

    /// The dispatcher refused or failed the call.
    #[error(transparent)]
    Sts(#[from] StsError),

    /// The registry could not be read.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Digest authentication failed internally.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TokenNotFound(_) => StatusCode::NOT_FOUND,
            Self::Sts(err) => match err {
                StsError::PermissionDenied => StatusCode::FORBIDDEN,
                StsError::NoProviderFound(_) => StatusCode::NOT_FOUND,
                StsError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                StsError::Saml(saml) => {
                    StatusCode::from_u16(saml.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Registry(_) | Self::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::TokenNotFound(_) => "token_not_found",
            Self::Sts(StsError::PermissionDenied) => "access_denied",
            Self::Sts(StsError::NoProviderFound(_)) => "no_provider",
            Self::Sts(StsError::InvalidRequest(_)) => "invalid_request",
            Self::Sts(_) => "sts_error",
            Self::Registry(_) => "storage_error",
            Self::Auth(_) => "authentication_error",
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error: String,
    /// Human-readable error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "STS request failed");
        }
        let body = ErrorResponse {
            error: self.error_code().to_string(),
            error_description: Some(self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for STS API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatcher_errors_map_to_statuses() {
        assert_eq!(ApiError::from(StsError::PermissionDenied).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(StsError::NoProviderFound("x".to_string())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(StsError::Configuration("x".to_string())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn missing_token_is_not_found() {
        let err = ApiError::TokenNotFound("_abc".to_string());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), "token_not_found");
        assert!(err.to_string().contains("_abc"));
    }
}
