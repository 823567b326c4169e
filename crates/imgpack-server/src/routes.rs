//! HTTP routes.
//!
//! | method | path                 | handler      |
//! |--------|----------------------|--------------|
//! | GET    | `/`                  | `index`      |
//! | POST   | `/api/create-zip`    | `create_zip` |
//! | GET    | `/downloads/:file`   | `download`   |

use std::io;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use imgpack_core::app::BundlePipeline;
use imgpack_core::domain::ArtifactLocator;
use imgpack_core::domain::artifact::parse_file_name;
use imgpack_core::ports::ArtifactStore;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::ApiError;
use crate::validate;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<BundlePipeline>,
    pub store: Arc<dyn ArtifactStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/create-zip", post(create_zip))
        .route("/downloads/:file", get(download))
        .with_state(state)
}

async fn index() -> &'static str {
    "Welcome to imgpack!"
}

async fn create_zip(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ArtifactLocator>, ApiError> {
    let request = validate::create_zip_request(&body).map_err(ApiError::Validation)?;
    let bundle = state.pipeline.create_bundle(request).await?;
    Ok(Json(bundle.locator))
}

async fn download(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_file_name(&file).ok_or(ApiError::NotFound)?;
    let path = state.store.resolve(&id).await?;

    // resolve と open の間に GC が消すことがある
    let file_handle = match tokio::fs::File::open(&path).await {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ApiError::NotFound),
        Err(e) => return Err(ApiError::Read(e)),
    };
    let length = file_handle.metadata().await.map_err(ApiError::Read)?.len();
    debug!(artifact = %id, bytes = length, "serving artifact");

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{file}\""))
        .map_err(|e| ApiError::Read(io::Error::other(e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(length)),
        ],
        Body::from_stream(ReaderStream::new(file_handle)),
    )
        .into_response())
}
