//! HTTP-facing errors.
//!
//! レスポンスには内部のパスやスタックトレースを含めません。
//! 詳細はログにだけ出します。

use std::io;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use imgpack_core::domain::{ErrorKind, PipelineError, StoreError};
use serde_json::json;
use tracing::error;

use crate::validate::FieldError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request validation failed")]
    Validation(Vec<FieldError>),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("not found")]
    NotFound,

    #[error("could not read artifact: {0}")]
    Read(#[source] io::Error),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ApiError::NotFound,
            StoreError::Io(e) => ApiError::Read(e),
            StoreError::InvalidRetention => {
                ApiError::Read(io::Error::other(StoreError::InvalidRetention.to_string()))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            ApiError::Pipeline(err) => match err.kind() {
                ErrorKind::Permanent => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "Could not fetch any images" })),
                )
                    .into_response(),
                ErrorKind::Transient | ErrorKind::Infrastructure => {
                    error!(error = %err, "bundle creation failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": "Failed to create ZIP file" })),
                    )
                        .into_response()
                }
            },
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
            }
            ApiError::Read(err) => {
                error!(error = %err, "artifact could not be served");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

/// Failures that stop the process before or while serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("storage: {0}")]
    Store(#[from] StoreError),

    #[error("http client: {0}")]
    Client(String),

    #[error("public url: {0}")]
    PublicUrl(#[from] url::ParseError),

    #[error("io: {0}")]
    Io(#[from] io::Error),
}
