// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::models::Provider;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// No stored integration token for the requested provider.
    #[error("{0} not connected")]
    NotConnected(Provider),

    /// FHIR patient search returned no entries.
    #[error("Patient not found")]
    PatientNotFound,

    /// Required provider endpoint or credential is not configured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Provider API error: {0}")]
    ProviderApi(String),

    /// A provider record was malformed and the sync runs in strict mode.
    #[error("Invalid provider record: {0}")]
    InvalidRecord(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Message used when a provider rejects the stored access token.
    pub const PROVIDER_TOKEN_ERROR: &'static str = "Access token rejected by provider";

    /// Returns true if the error indicates a revoked or expired provider token.
    pub fn is_provider_token_error(&self) -> bool {
        matches!(self, AppError::ProviderApi(msg) if msg == Self::PROVIDER_TOKEN_ERROR)
    }

    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::NotConnected(_) => (StatusCode::CONFLICT, "not_connected"),
            AppError::PatientNotFound => (StatusCode::NOT_FOUND, "patient_not_found"),
            AppError::Configuration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
            AppError::ProviderApi(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
            AppError::InvalidRecord(_) => (StatusCode::BAD_GATEWAY, "invalid_record"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_code();

        let details = match &self {
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::ProviderApi(msg)
            | AppError::InvalidRecord(msg) => Some(msg.clone()),
            AppError::NotConnected(_) | AppError::PatientNotFound => Some(self.to_string()),
            AppError::Configuration(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                None
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                None
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                None
            }
            AppError::Unauthorized | AppError::InvalidToken => None,
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_connected_message_uses_display_name() {
        let err = AppError::NotConnected(Provider::Oura);
        assert_eq!(err.to_string(), "Oura not connected");

        let err = AppError::NotConnected(Provider::Fhir);
        assert_eq!(err.to_string(), "FHIR not connected");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::NotConnected(Provider::Garmin).status_and_code().0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::PatientNotFound.status_and_code(),
            (StatusCode::NOT_FOUND, "patient_not_found")
        );
        assert_eq!(
            AppError::ProviderApi("boom".into()).status_and_code().0,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Configuration("FHIR_BASE_URL".into())
                .status_and_code()
                .1,
            "configuration_error"
        );
    }

    #[test]
    fn test_provider_token_error() {
        let err = AppError::ProviderApi(AppError::PROVIDER_TOKEN_ERROR.to_string());
        assert!(err.is_provider_token_error());

        let err = AppError::ProviderApi("HTTP 500: oops".to_string());
        assert!(!err.is_provider_token_error());
    }
}
