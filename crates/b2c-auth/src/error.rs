//! Scheme registration and resolution errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use utoipa::ToSchema;

use crate::host::HostError;

/// Errors raised while composing or resolving virtual schemes.
///
/// Every variant is a configuration defect: none of them is retried.
#[derive(Error, Debug)]
pub enum AuthSchemeError {
    #[error("Invalid scheme name: {message}")]
    InvalidSchemeName { message: String },

    #[error("Duplicate scheme: {scheme}")]
    DuplicateScheme { scheme: String },

    #[error("Scheme not found: {scheme}")]
    SchemeNotFound { scheme: String },

    #[error("Invalid options for scheme {scheme}: {message}")]
    InvalidOptions { scheme: String, message: String },

    #[error(transparent)]
    Host(#[from] HostError),
}

impl AuthSchemeError {
    pub fn invalid_scheme_name(message: impl Into<String>) -> Self {
        Self::InvalidSchemeName { message: message.into() }
    }

    pub fn duplicate(scheme: impl Into<String>) -> Self {
        Self::DuplicateScheme { scheme: scheme.into() }
    }

    pub fn not_found(scheme: impl Into<String>) -> Self {
        Self::SchemeNotFound { scheme: scheme.into() }
    }

    pub fn invalid_options(scheme: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            scheme: scheme.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthSchemeError>;

/// Error response body
#[derive(Debug, serde::Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AuthSchemeError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            AuthSchemeError::SchemeNotFound { .. } => (StatusCode::NOT_FOUND, "SCHEME_NOT_FOUND"),
            AuthSchemeError::Host(HostError::UnknownScheme(_)) => {
                (StatusCode::NOT_FOUND, "UNKNOWN_SCHEME")
            }
            AuthSchemeError::InvalidOptions { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INVALID_OPTIONS")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Authentication configuration error");
        }

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            AuthSchemeError::duplicate("b2c").to_string(),
            "Duplicate scheme: b2c"
        );
        assert_eq!(
            AuthSchemeError::not_found("unknown").to_string(),
            "Scheme not found: unknown"
        );
        assert_eq!(
            AuthSchemeError::from(HostError::SchemeAlreadyExists("b2c-cookie".into())).to_string(),
            "Scheme already exists: b2c-cookie"
        );
    }

    #[test]
    fn test_status_codes() {
        let response = AuthSchemeError::not_found("unknown").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = AuthSchemeError::invalid_scheme_name("empty").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
