//! API error type and its JSON envelope

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use syllabus_core::KgError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Kg(#[from] KgError),

    /// Body or path that could not be decoded.
    #[error("{message}")]
    BadRequest { message: String, details: String },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Kg(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Kg(err) => match err {
                KgError::Validation(_) => StatusCode::BAD_REQUEST,
                KgError::DuplicateEntry(_) | KgError::ReadonlyGraph | KgError::CannotDeleteDefault => {
                    StatusCode::CONFLICT
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Kg(err) => err.code(),
            ApiError::BadRequest { .. } => "VALIDATION_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest {
            message: "Invalid request body".to_string(),
            details: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest {
            message: "Invalid path parameter".to_string(),
            details: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let mut error = json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        if let ApiError::BadRequest { details, .. } = &self {
            error["details"] = json!(details);
        }

        (status, Json(json!({ "success": false, "error": error }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
