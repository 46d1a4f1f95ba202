//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and the one place
//! where an error becomes an HTTP status and a JSON envelope.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bookstore_core::ports::PortError;
use bookstore_core::services::ServiceError;
use tracing::error;

use crate::config::ConfigError;
use crate::web::envelope::Envelope;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A request rejected or failed by one of the core services.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request could not be read (malformed JSON, broken multipart body).
    #[error("{0}")]
    BadRequest(String),

    /// The caller could not be identified.
    #[error("{0}")]
    Unauthorized(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    /// The status code and the caller-facing message for this error.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Service(ServiceError::Validation(msg)) | ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            ApiError::Service(ServiceError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Service(ServiceError::Port(port)) | ApiError::Port(port) => port_status(port),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

fn port_status(e: &PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
        PortError::Conflict(value) => (
            StatusCode::BAD_REQUEST,
            format!("\"{value}\" already exists"),
        ),
        PortError::RateLimited(_) => (
            StatusCode::TOO_MANY_REQUESTS,
            "The assistant is receiving too many requests. Please try again in a moment."
                .to_string(),
        ),
        PortError::UpstreamAuth(_) => (
            StatusCode::UNAUTHORIZED,
            "The assistant service rejected our credentials.".to_string(),
        ),
        PortError::Unexpected(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong while processing the request.".to_string(),
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(Envelope::<()>::failure(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(e: ApiError) -> StatusCode {
        e.status_and_message().0
    }

    #[test]
    fn every_failure_kind_maps_to_one_status() {
        assert_eq!(
            status(ServiceError::Validation("x".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(ServiceError::NotFound("x".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(ServiceError::Port(PortError::RateLimited("x".into())).into()),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status(PortError::UpstreamAuth("x".into()).into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(PortError::Unexpected("x".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(PortError::Conflict("x".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(ApiError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_message_is_passed_through() {
        let (_, message) =
            ApiError::from(ServiceError::Validation("Please enter a question".into()))
                .status_and_message();
        assert_eq!(message, "Please enter a question");
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let (_, message) = ApiError::Internal("secret path /etc".into()).status_and_message();
        assert!(!message.contains("/etc"));
    }
}
