//! API error types with IntoResponse.
//!
//! The catalog API is external-facing: the real error is logged server-side
//! and the client gets a deliberately generic body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::db::DbError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Database failure (500, logged)
    #[error("database error: {0}")]
    Database(#[from] DbError),

    /// Anything else that went wrong while building the response (500, logged)
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Database(err) => {
                tracing::error!("database error: {err}");
                "Database error"
            }
            ApiError::Internal(detail) => {
                tracing::error!("internal error: {detail}");
                "Internal server error"
            }
        };

        let body = Json(json!({
            "status": "0",
            "message": message,
        }));

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        // row decoding happens after the manager has done its job; a bad
        // column value is an internal fault, not a database outage
        ApiError::Internal(err.to_string())
    }
}
