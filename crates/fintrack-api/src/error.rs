//! Error types for fintrack-api

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fintrack_core::{CoreError, ErrorCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Core(error) => match error.code() {
                ErrorCode::EntityNotFound => StatusCode::NOT_FOUND,
                ErrorCode::Transport | ErrorCode::LookupFailed => StatusCode::BAD_GATEWAY,
                ErrorCode::Rejected
                | ErrorCode::UnknownOptionSource
                | ErrorCode::UnknownFilter
                | ErrorCode::FiltersDisabled
                | ErrorCode::InvalidState
                | ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,
                ErrorCode::ConfigError | ErrorCode::IoError | ErrorCode::InternalError => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Core(error) => serde_json::json!({
                "success": false,
                "error": error.to_details(),
            }),
            other => serde_json::json!({
                "success": false,
                "message": other.to_string(),
            }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = ApiError::NotFound { resource: "budgets".to_string() };
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: ApiError = CoreError::Rejected { message: "duplicate".to_string() }.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Rejected by backend: duplicate");

        let err: ApiError = CoreError::Transport { message: "down".to_string() }.into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
