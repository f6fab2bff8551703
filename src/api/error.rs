use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::models::ValidationError;
use crate::storage::StorageError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Error half of every handler result.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: error.into(),
                details: None,
            },
        }
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    pub fn not_found(error: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error)
    }

    /// Log `err` and answer with a generic 500 carrying `message`.
    pub fn internal(message: &str, err: impl std::fmt::Display) -> Self {
        tracing::error!("{}: {}", message, err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Map a storage failure; anything without a domain meaning becomes a
    /// 500 with `message`.
    pub fn storage(message: &str, err: StorageError) -> Self {
        match err {
            StorageError::NotFound { .. } | StorageError::NoInventory { .. } => {
                Self::not_found(err.to_string())
            }
            StorageError::InsufficientStock { available, .. } => Self {
                status: StatusCode::CONFLICT,
                body: ErrorResponse {
                    error: "Insufficient stock".to_string(),
                    details: Some(format!("{available} available")),
                },
            },
            StorageError::InvalidReference(_) => Self::bad_request(err.to_string()),
            StorageError::InUse { .. } => Self::new(StatusCode::CONFLICT, err.to_string()),
            StorageError::Other(e) => Self::internal(message, e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::bad_request(err.0)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
