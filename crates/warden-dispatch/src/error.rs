//! Dispatch error taxonomy.
//!
//! Every failure a caller can observe maps to one [`ErrorKind`] with a
//! stable string. Messages never carry tokens, cache keys or backtraces.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use warden_session::{UnauthorizedReason, ValidationError};

use crate::descriptor::ProtectionLevel;

/// Stable classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingToken,
    SessionNotFoundOrExpired,
    NoSuchFunction,
    MalformedArguments,
    InsufficientProtection,
    HandlerFailure,
    StorageUnavailable,
}

impl ErrorKind {
    /// The wire string for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::SessionNotFoundOrExpired => "session_not_found_or_expired",
            Self::NoSuchFunction => "no_such_function",
            Self::MalformedArguments => "malformed_arguments",
            Self::InsufficientProtection => "insufficient_protection",
            Self::HandlerFailure => "handler_failure",
            Self::StorageUnavailable => "storage_unavailable",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified call failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// An authenticated function was called without a token.
    #[error("Missing access token")]
    MissingToken,

    /// The presented token names no live session.
    #[error("Session not found or expired")]
    SessionNotFoundOrExpired,

    /// The owner type has no function with this id.
    #[error("No such function: {owner_type}.{func_id}")]
    NoSuchFunction { owner_type: String, func_id: String },

    /// The payload does not match the function's argument shape.
    #[error("Malformed arguments: {0}")]
    MalformedArguments(String),

    /// The channel does not provide the protection the function requires.
    #[error("Function '{func_id}' requires {required} channel protection")]
    InsufficientProtection {
        func_id: String,
        required: ProtectionLevel,
    },

    /// The handler itself failed; carries the handler's own reason.
    #[error("{0}")]
    HandlerFailure(String),

    /// The session store could not be reached. Transient.
    #[error("Session storage unavailable")]
    StorageUnavailable,
}

impl DispatchError {
    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingToken => ErrorKind::MissingToken,
            Self::SessionNotFoundOrExpired => ErrorKind::SessionNotFoundOrExpired,
            Self::NoSuchFunction { .. } => ErrorKind::NoSuchFunction,
            Self::MalformedArguments(_) => ErrorKind::MalformedArguments,
            Self::InsufficientProtection { .. } => ErrorKind::InsufficientProtection,
            Self::HandlerFailure(_) => ErrorKind::HandlerFailure,
            Self::StorageUnavailable => ErrorKind::StorageUnavailable,
        }
    }

    /// Whether a retry of the same call might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StorageUnavailable)
    }

    /// Whether the failure was detected before the handler ran.
    pub fn is_pre_invocation(&self) -> bool {
        !matches!(self, Self::HandlerFailure(_))
    }

    /// Wire representation.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl From<UnauthorizedReason> for DispatchError {
    fn from(reason: UnauthorizedReason) -> Self {
        match reason {
            UnauthorizedReason::MissingToken => Self::MissingToken,
            UnauthorizedReason::SessionNotFoundOrExpired => Self::SessionNotFoundOrExpired,
        }
    }
}

impl From<ValidationError> for DispatchError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::Unauthorized(reason) => reason.into(),
            ValidationError::StorageUnavailable(_) => Self::StorageUnavailable,
        }
    }
}

/// Error part of a result envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable classification.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
}
