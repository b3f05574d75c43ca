use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::ErrorResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing, invalid or expired bearer token")]
    Unauthenticated,

    #[error("token is not valid for {0}")]
    Unauthorized(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    DuplicateEntity(&'static str),

    #[error("review already submitted for this product")]
    DuplicateReview,

    #[error("{0}")]
    ValidationError(String),

    #[error(transparent)]
    StoreError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    /// Logs the failure with its full source chain and wraps it.
    pub fn store(context: &str, err: anyhow::Error) -> Self {
        tracing::error!("{}: {}", context, crate::unpack_error(&*err));
        AppError::StoreError(err)
    }

    pub fn status(&self) -> StatusCode {
        use AppError::*;
        match self {
            Unauthenticated | Unauthorized(_) => StatusCode::UNAUTHORIZED,
            NotFound(_) => StatusCode::NOT_FOUND,
            ValidationError(_) => StatusCode::BAD_REQUEST,
            DuplicateEntity(_) | DuplicateReview => StatusCode::CONFLICT,
            StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::StoreError(_) => "internal server error".to_string(),
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}
