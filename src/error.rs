//! Error types for the AI Gateway.
//!
//! Defines a unified error type that maps cleanly to HTTP responses.

use std::any::Any;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::domain::SafetyCategory;
use crate::provider::{ProviderError, RegistryError};

/// Message returned to clients for any internal fault.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// Unified error type for gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The safety pipeline rejected the prompt or the generated output.
    #[error("Content safety rejection: {detail}")]
    ContentSafety {
        category: Option<SafetyCategory>,
        detail: String,
    },

    #[error("{0}")]
    UnknownProvider(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RegistryError> for GatewayError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotRegistered(_) => GatewayError::UnknownProvider(err.to_string()),
            RegistryError::AlreadyRegistered(_) => GatewayError::Config(err.to_string()),
        }
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError::Validation(rejection.body_text())
    }
}

/// Error response body for API clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Body of a content-safety rejection.
#[derive(Debug, Serialize, ToSchema)]
pub struct SafetyRejection {
    /// Always `content_safety`.
    pub error: String,
    pub category: Option<SafetyCategory>,
    pub detail: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            GatewayError::ContentSafety { category, detail } => {
                let body = SafetyRejection {
                    error: "content_safety".to_string(),
                    category,
                    detail,
                };
                return (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
            }
            GatewayError::UnknownProvider(msg) => {
                (StatusCode::BAD_REQUEST, "UNKNOWN_PROVIDER", msg, None)
            }
            GatewayError::Validation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", msg, None)
            }
            GatewayError::Provider(e) => {
                tracing::warn!(
                    provider = %e.provider,
                    status = e.status_code,
                    error = %e.message,
                    "Provider error"
                );
                let status = StatusCode::from_u16(e.status_code)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                (status, "PROVIDER_ERROR", e.message, Some(e.provider))
            }
            GatewayError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, None),
            GatewayError::Config(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIG_ERROR",
                    "Configuration error".to_string(),
                    None,
                )
            }
            GatewayError::Internal(msg) => {
                // Log the actual error but don't expose internals
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    INTERNAL_ERROR_MESSAGE.to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Panic handler for the HTTP boundary.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    GatewayError::Internal(detail).into_response()
}
