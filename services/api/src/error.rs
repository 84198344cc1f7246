//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its translation
//! into the JSON error responses every handler returns.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use component_forge_core::ports::PortError;
use serde::Serialize;
use tracing::error;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error from running the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// Missing credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Credentials that were presented but rejected.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// A required server-side setting is absent.
    #[error("{0}")]
    Configuration(String),

    #[error("Request timeout. Please try again.")]
    UpstreamTimeout,

    #[error("Invalid OpenRouter API key")]
    UpstreamAuth,

    #[error("Rate limit exceeded. Please try again later.")]
    UpstreamRateLimited,

    /// The inbound per-client limiter rejected the request.
    #[error("Too many requests from this IP, please try again later.")]
    TooManyRequests,

    /// Generation failed for a reason not covered above. `details` is only
    /// populated in the development environment.
    #[error("Failed to generate component. Please try again.")]
    GenerationFailed { details: Option<String> },

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    /// Maps an upstream failure of the completion port to its HTTP counterpart.
    pub fn from_generation(err: PortError, expose_details: bool) -> Self {
        match err {
            PortError::Validation(message) => ApiError::Validation(message),
            PortError::Timeout => ApiError::UpstreamTimeout,
            PortError::UpstreamAuth => ApiError::UpstreamAuth,
            PortError::RateLimited => ApiError::UpstreamRateLimited,
            PortError::NotFound(message) => ApiError::NotFound(message),
            other => ApiError::GenerationFailed {
                details: expose_details.then(|| other.to_string()),
            },
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) | ApiError::UpstreamAuth => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UpstreamTimeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::UpstreamRateLimited | ApiError::TooManyRequests => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::Port(PortError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Port(PortError::Validation(_)) | ApiError::Port(PortError::Conflict(_)) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Port(PortError::NotFound(message))
            | ApiError::Port(PortError::Validation(message))
            | ApiError::Port(PortError::Conflict(message)) => message.clone(),
            ApiError::Config(_)
            | ApiError::Port(_)
            | ApiError::Database(_)
            | ApiError::Migration(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let details = match &self {
            ApiError::GenerationFailed { details } => details.clone(),
            _ => None,
        };
        let body = ErrorBody {
            error: self.public_message(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_failures_map_to_distinct_statuses() {
        let cases = [
            (PortError::Timeout, StatusCode::REQUEST_TIMEOUT),
            (PortError::UpstreamAuth, StatusCode::UNAUTHORIZED),
            (PortError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (PortError::Upstream("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (PortError::Validation("Prompt is required".into()), StatusCode::BAD_REQUEST),
        ];
        for (port_error, status) in cases {
            assert_eq!(ApiError::from_generation(port_error, false).status(), status);
        }
    }

    #[test]
    fn store_errors_keep_client_messages_and_hide_internals() {
        let cases = [
            (
                PortError::NotFound("Session not found".into()),
                StatusCode::NOT_FOUND,
                "Session not found",
            ),
            (PortError::Conflict("taken".into()), StatusCode::BAD_REQUEST, "taken"),
            (
                PortError::Unexpected("pool timed out".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            ),
        ];
        for (port_error, status, message) in cases {
            let err = ApiError::Port(port_error);
            assert_eq!(err.status(), status);
            assert_eq!(err.public_message(), message);
        }
    }

    #[test]
    fn generation_details_are_opt_in() {
        let hidden = ApiError::from_generation(PortError::Upstream("secret".into()), false);
        assert!(matches!(hidden, ApiError::GenerationFailed { details: None }));

        let shown = ApiError::from_generation(PortError::Upstream("secret".into()), true);
        assert!(matches!(
            shown,
            ApiError::GenerationFailed { details: Some(d) } if d.contains("secret")
        ));
    }

    #[test]
    fn internal_errors_do_not_leak() {
        let err = ApiError::Internal("connection string with password".into());
        assert_eq!(err.public_message(), "Internal server error");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_session_is_not_found() {
        let err = ApiError::from(PortError::NotFound("Session not found".into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.public_message(), "Session not found");
    }
}
