//! Error types for the Keystone API.
//!
//! ## Status Mapping
//! ```text
//! ValidationError, CodeMismatch, UnbalancedEntry ──► 422
//! ForeignKeyViolation, CheckViolation            ──► 422
//! NotFound                                       ──► 404
//! UniqueViolation, InvalidStatus                 ──► 409
//! missing / bad token, InvalidCredentials        ──► 401
//! Forbidden                                      ──► 403
//! storage failures                               ──► 500 (detail logged only)
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use keystone_core::{CoreError, ValidationError};
use keystone_db::DbError;
use serde::Serialize;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

/// What an HTTP client sees when a request fails.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn internal() -> Self {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "Internal server error",
        )
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "validation", err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => e.into(),
            CoreError::CodeMismatch { .. } | CoreError::UnbalancedEntry { .. } => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "validation", err.to_string())
            }
            CoreError::InvalidStatus { .. } => {
                ApiError::new(StatusCode::CONFLICT, "invalid_status", err.to_string())
            }
            CoreError::Forbidden { .. } => ApiError::forbidden(err.to_string()),
            CoreError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(e) => e.into(),
            DbError::NotFound { .. } => ApiError::not_found(err.to_string()),
            DbError::UniqueViolation { .. } => ApiError::new(
                StatusCode::CONFLICT,
                "duplicate",
                format!("Creation failed. {}", err),
            ),
            DbError::ForeignKeyViolation { .. } => ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation",
                "A referenced record does not exist",
            ),
            DbError::CheckViolation { .. } => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "validation", err.to_string())
            }
            other => {
                error!(error = %other, "Storage failure");
                ApiError::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(&self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (ValidationError::required("name").into(), StatusCode::UNPROCESSABLE_ENTITY),
            (DbError::not_found("Invoice", 7).into(), StatusCode::NOT_FOUND),
            (DbError::duplicate("code", "HUMRES").into(), StatusCode::CONFLICT),
            (
                DbError::Domain(CoreError::CodeMismatch {
                    code: "C-1".to_string(),
                    series: "customer".to_string(),
                })
                .into(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (CoreError::InvalidCredentials.into(), StatusCode::UNAUTHORIZED),
            (DbError::PoolExhausted.into(), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.status, status, "{}", err);
        }
    }

    #[test]
    fn test_storage_detail_not_leaked() {
        let err: ApiError = DbError::Internal("disk I/O error at page 42".to_string()).into();
        assert_eq!(err.message, "Internal server error");
    }

    #[test]
    fn test_duplicate_message_names_value() {
        let err: ApiError = DbError::duplicate("code", "HUMRES").into();
        assert!(err.message.starts_with("Creation failed."));
        assert!(err.message.contains("HUMRES"));
    }
}
