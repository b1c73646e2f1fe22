use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The main error type for Quayside operations
#[derive(Debug, thiserror::Error)]
pub enum QuaysideError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, QuaysideError>;

/// Standard error response format for API errors.
#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
    error_id: String,
}

impl QuaysideError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status this error maps to.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message that is safe to expose to clients.
    ///
    /// Internal errors show a generic message to prevent information
    /// disclosure; the full detail is logged server-side.
    #[must_use]
    pub fn safe_message(&self) -> String {
        match self {
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for QuaysideError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_id = uuid::Uuid::new_v4().to_string();

        // Full detail stays server-side; clients get the safe message plus
        // an error id they can quote when reporting problems.
        if status.is_server_error() {
            tracing::error!(
                status = status.as_u16(),
                error_id = %error_id,
                "{}",
                self
            );
        } else {
            tracing::debug!(
                status = status.as_u16(),
                error_id = %error_id,
                "{}",
                self
            );
        }

        let body = Json(ErrorResponse {
            error: self.safe_message(),
            error_id,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            QuaysideError::not_found("x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            QuaysideError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            QuaysideError::forbidden("x").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            QuaysideError::internal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_safe_message_hides_internal_detail() {
        let err = QuaysideError::internal("database password rejected");
        assert_eq!(err.safe_message(), "Internal server error");

        let err = QuaysideError::bad_request("check-out must be after check-in");
        assert!(err.safe_message().contains("check-out"));
    }

    #[test]
    fn test_display() {
        let err = QuaysideError::not_found("Booking not found");
        assert_eq!(err.to_string(), "Not found: Booking not found");
    }
}
