//! Namespace and document HTTP handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Json, Path, Query,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

use crate::error::Error;
use crate::server::AppState;
use crate::storage::ScanOptions;

/// Handler-level error: either a malformed request detected at the HTTP
/// boundary, or a store error mapped through the taxonomy.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Store(Error),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Store(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Store(e) => {
                let status = match &e {
                    Error::InvalidName(_) | Error::InvalidKey(_) => StatusCode::BAD_REQUEST,
                    Error::DuplicateKey(_) => StatusCode::CONFLICT,
                    Error::NotFound(_) => StatusCode::NOT_FOUND,
                    // Namespace collisions surface as 500, matching the
                    // public contract; engine failures are always 500.
                    Error::AlreadyExists(_) | Error::Engine(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, e.to_string())
            }
        };
        (status, Json(json!({"ok": false, "error": message}))).into_response()
    }
}

// ===== Namespace handlers =====

/// `POST /dbs/:name`
#[instrument(skip(state))]
pub async fn create_namespace(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    state.store.create_namespace(&name)?;
    Ok((StatusCode::CREATED, Json(json!({"ok": true, "db": name}))).into_response())
}

/// `DELETE /dbs/:name`
#[instrument(skip(state))]
pub async fn delete_namespace(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.store.delete_namespace(&name)?;
    Ok(Json(json!({"ok": true})))
}

/// `GET /dbs`
#[instrument(skip(state))]
pub async fn list_namespaces(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let databases = state.store.list_namespaces();
    Ok(Json(json!({"ok": true, "databases": databases})))
}

// ===== Document handlers =====

/// `POST /dbs/:db/docs` with body `{key, value}`.
///
/// The body is taken as raw JSON so an explicit `"value": null` stays
/// distinguishable from a missing field.
#[instrument(skip(state, body))]
pub async fn create_doc(
    Extension(state): Extension<Arc<AppState>>,
    Path(db): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let key = body
        .get("key")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::BadRequest("request body must include a string 'key'".into()))?;
    let value = body
        .get("value")
        .ok_or_else(|| ApiError::BadRequest("request body must include 'value'".into()))?;

    state.store.create_doc(&db, key, value)?;
    Ok((StatusCode::CREATED, Json(json!({"ok": true, "key": key}))).into_response())
}

/// `GET /dbs/:db/docs/:id`
#[instrument(skip(state))]
pub async fn get_doc(
    Extension(state): Extension<Arc<AppState>>,
    Path((db, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let value = state.store.get_doc(&db, &id)?;
    Ok(Json(json!({"ok": true, "key": id, "value": value})))
}

/// `PUT /dbs/:db/docs/:id` with body `{value}`.
#[instrument(skip(state, body))]
pub async fn update_doc(
    Extension(state): Extension<Arc<AppState>>,
    Path((db, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    let value = body
        .get("value")
        .ok_or_else(|| ApiError::BadRequest("request body must include 'value'".into()))?;

    state.store.update_doc(&db, &id, value)?;
    Ok(Json(json!({"ok": true})))
}

/// `DELETE /dbs/:db/docs/:id`
#[instrument(skip(state))]
pub async fn delete_doc(
    Extension(state): Extension<Arc<AppState>>,
    Path((db, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    state.store.delete_doc(&db, &id)?;
    Ok(Json(json!({"ok": true})))
}

/// Listing options as they appear on the query string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub start_key: Option<String>,
    pub end_key: Option<String>,
    pub prefix: Option<String>,
    pub limit: Option<usize>,
}

/// `GET /dbs/:db/docs?startKey&endKey&prefix&limit`
#[instrument(skip(state))]
pub async fn list_docs(
    Extension(state): Extension<Arc<AppState>>,
    Path(db): Path<String>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let options = ScanOptions {
        start_key: params.start_key,
        end_key: params.end_key,
        prefix: params.prefix,
        limit: params.limit,
    };

    let docs: Vec<Value> = state
        .store
        .list_docs(&db, &options)?
        .into_iter()
        .map(|(key, value)| json!({"key": key, "value": value}))
        .collect();
    Ok(Json(json!({"ok": true, "docs": docs})))
}
