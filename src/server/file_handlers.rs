//! Bucket and file HTTP handlers. File bodies are raw bytes, not JSON.

use axum::{
    body::Bytes,
    extract::{Extension, Json, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

use crate::server::handlers::ApiError;
use crate::server::AppState;

/// `GET /buckets`
#[instrument(skip(state))]
pub async fn list_buckets(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let buckets = state.files.list_buckets().await?;
    Ok(Json(json!({"ok": true, "buckets": buckets})))
}

/// `POST /buckets/:name`
#[instrument(skip(state))]
pub async fn create_bucket(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    state.files.create_bucket(&name).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"ok": true, "bucket": name})),
    )
        .into_response())
}

/// `DELETE /buckets/:name`
#[instrument(skip(state))]
pub async fn delete_bucket(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.files.delete_bucket(&name).await?;
    Ok(Json(json!({"ok": true})))
}

/// `GET /buckets/:bucket/files`
#[instrument(skip(state))]
pub async fn list_files(
    Extension(state): Extension<Arc<AppState>>,
    Path(bucket): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let files = state.files.list_files(&bucket).await?;
    Ok(Json(json!({"ok": true, "files": files})))
}

/// `PUT /buckets/:bucket/files/:name` - the request body is stored verbatim.
#[instrument(skip(state, body))]
pub async fn put_file(
    Extension(state): Extension<Arc<AppState>>,
    Path((bucket, name)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let size = state.files.put_file(&bucket, &name, &body).await?;
    Ok(Json(json!({"ok": true, "name": name, "size": size})))
}

/// `GET /buckets/:bucket/files/:name` - raw bytes back.
#[instrument(skip(state))]
pub async fn get_file(
    Extension(state): Extension<Arc<AppState>>,
    Path((bucket, name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let bytes = state.files.get_file(&bucket, &name).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    )
        .into_response())
}

/// `DELETE /buckets/:bucket/files/:name`
#[instrument(skip(state))]
pub async fn delete_file(
    Extension(state): Extension<Arc<AppState>>,
    Path((bucket, name)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    state.files.delete_file(&bucket, &name).await?;
    Ok(Json(json!({"ok": true})))
}
