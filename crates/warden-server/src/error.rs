//! Error types for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use warden_dispatch::{DispatchError, ErrorKind, ResultEnvelope};

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A dispatch failure, reported as a result envelope.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The request body could not be read (e.g. it exceeds the size limit).
    /// Reported as a result envelope with the transport's status code.
    #[error("{error}")]
    Body {
        status: StatusCode,
        error: DispatchError,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body for non-dispatch failures.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP status for a dispatch failure.
pub fn dispatch_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::MissingToken | ErrorKind::SessionNotFoundOrExpired => StatusCode::UNAUTHORIZED,
        ErrorKind::InsufficientProtection => StatusCode::FORBIDDEN,
        ErrorKind::NoSuchFunction => StatusCode::NOT_FOUND,
        ErrorKind::MalformedArguments => StatusCode::BAD_REQUEST,
        ErrorKind::HandlerFailure => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if let ServerError::Dispatch(err) = &self {
            let status = dispatch_status(err.kind());
            if err.is_transient() {
                tracing::error!(status = %status, kind = %err.kind(), "Dispatch failed");
            } else {
                tracing::warn!(status = %status, kind = %err.kind(), error = %err, "Call rejected");
            }
            return (status, Json(ResultEnvelope::from_error(err))).into_response();
        }
        if let ServerError::Body { status, error } = &self {
            tracing::warn!(status = %status, kind = %error.kind(), error = %error, "Request body rejected");
            return (*status, Json(ResultEnvelope::from_error(error))).into_response();
        }

        let (status, code) = match &self {
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServerError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            ServerError::Internal(_) | ServerError::Dispatch(_) | ServerError::Body { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(status = %status, code, error = %message, "Server error");
        } else {
            tracing::warn!(status = %status, code, error = %message, "Client error");
        }

        let body = ErrorResponse {
            code: code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(dispatch_status(ErrorKind::MissingToken), StatusCode::UNAUTHORIZED);
        assert_eq!(
            dispatch_status(ErrorKind::SessionNotFoundOrExpired),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(dispatch_status(ErrorKind::InsufficientProtection), StatusCode::FORBIDDEN);
        assert_eq!(dispatch_status(ErrorKind::NoSuchFunction), StatusCode::NOT_FOUND);
        assert_eq!(dispatch_status(ErrorKind::MalformedArguments), StatusCode::BAD_REQUEST);
        assert_eq!(
            dispatch_status(ErrorKind::HandlerFailure),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            dispatch_status(ErrorKind::StorageUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_dispatch_error_response() {
        let response = ServerError::from(DispatchError::MissingToken).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = ServerError::Body {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            error: DispatchError::MalformedArguments("length limit exceeded".to_string()),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let response = ServerError::NotFound("object 'Ledger'".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
