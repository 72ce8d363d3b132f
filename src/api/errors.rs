//! API error handling
//!
//! Structured error responses with HTTP status codes and request tracking.
//! Core errors map onto HTTP classes here; handlers never build status
//! codes by hand.

use crate::errors::CoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level API error response with request tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

/// Error body with structured information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error code (NOT_FOUND, INVALID_INPUT, INSUFFICIENT_FUNDS, ...)
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

/// API error with request tracking
#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub request_id: String,
}

#[derive(Debug)]
pub enum ApiErrorKind {
    BadRequest { code: &'static str, message: String },
    Forbidden(String),
    NotFound(String),
    Conflict { code: &'static str, message: String },
    UnprocessableEntity { code: &'static str, message: String },
    ServiceUnavailable(String),
    InternalError(String),
}

impl ApiError {
    pub fn bad_request(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::BadRequest {
                code: "INVALID_INPUT",
                message,
            },
            request_id,
        }
    }

    pub fn not_found(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::NotFound(message),
            request_id,
        }
    }

    pub fn internal_error(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::InternalError(message),
            request_id,
        }
    }

    /// Map a core error onto the API taxonomy.
    pub fn from_core(request_id: String, err: CoreError) -> Self {
        let kind = match &err {
            CoreError::InvalidInput(_) => ApiErrorKind::BadRequest {
                code: "INVALID_INPUT",
                message: err.to_string(),
            },
            CoreError::Forbidden(_) => ApiErrorKind::Forbidden(err.to_string()),
            CoreError::NotFound(_) => ApiErrorKind::NotFound(err.to_string()),
            CoreError::InvalidState(_) => ApiErrorKind::Conflict {
                code: "INVALID_STATE",
                message: err.to_string(),
            },
            CoreError::RoundNotActive(_) => ApiErrorKind::Conflict {
                code: "ROUND_NOT_ACTIVE",
                message: err.to_string(),
            },
            CoreError::AlreadyRedeemed => ApiErrorKind::Conflict {
                code: "ALREADY_REDEEMED",
                message: err.to_string(),
            },
            CoreError::Expired => ApiErrorKind::Conflict {
                code: "EXPIRED",
                message: err.to_string(),
            },
            CoreError::InsufficientFunds { .. } => ApiErrorKind::UnprocessableEntity {
                code: "INSUFFICIENT_FUNDS",
                message: err.to_string(),
            },
            CoreError::StorageConflict(_) => ApiErrorKind::ServiceUnavailable(err.to_string()),
            CoreError::StorageUnavailable(_) => ApiErrorKind::InternalError(err.to_string()),
        };
        Self { kind, request_id }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ApiErrorKind::BadRequest { message, .. } => {
                write!(f, "[{}] Bad Request: {}", self.request_id, message)
            }
            ApiErrorKind::Forbidden(msg) => write!(f, "[{}] Forbidden: {}", self.request_id, msg),
            ApiErrorKind::NotFound(msg) => write!(f, "[{}] Not Found: {}", self.request_id, msg),
            ApiErrorKind::Conflict { message, .. } => {
                write!(f, "[{}] Conflict: {}", self.request_id, message)
            }
            ApiErrorKind::UnprocessableEntity { message, .. } => {
                write!(f, "[{}] Unprocessable: {}", self.request_id, message)
            }
            ApiErrorKind::ServiceUnavailable(msg) => {
                write!(f, "[{}] Service Unavailable: {}", self.request_id, msg)
            }
            ApiErrorKind::InternalError(msg) => {
                write!(f, "[{}] Internal Error: {}", self.request_id, msg)
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self.kind {
            ApiErrorKind::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            ApiErrorKind::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiErrorKind::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiErrorKind::Conflict { code, message } => (StatusCode::CONFLICT, code, message),
            ApiErrorKind::UnprocessableEntity { code, message } => {
                (StatusCode::UNPROCESSABLE_ENTITY, code, message)
            }
            ApiErrorKind::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg)
            }
            ApiErrorKind::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
        };

        let body = Json(ErrorResponse {
            request_id: self.request_id,
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let err = ApiError::from_core(
            "req-1".to_string(),
            CoreError::InsufficientFunds {
                balance: 1,
                required: 2,
            },
        );
        assert!(matches!(err.kind, ApiErrorKind::UnprocessableEntity { .. }));

        let err = ApiError::from_core("req-1".to_string(), CoreError::AlreadyRedeemed);
        assert!(matches!(err.kind, ApiErrorKind::Conflict { code: "ALREADY_REDEEMED", .. }));

        let err = ApiError::from_core(
            "req-1".to_string(),
            CoreError::RoundNotActive("r-1".to_string()),
        );
        assert!(matches!(err.kind, ApiErrorKind::Conflict { code: "ROUND_NOT_ACTIVE", .. }));
    }
}
