//! API key HTTP handlers.

use axum::{
    extract::{rejection::JsonRejection, Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

use crate::server::handlers::ApiError;
use crate::server::AppState;

/// `POST /auth` with optional body `{name}`. Returns the raw secret once.
#[instrument(skip(state, body))]
pub async fn generate_key(
    Extension(state): Extension<Arc<AppState>>,
    body: Option<Json<Value>>,
) -> Result<Response, ApiError> {
    let name = body
        .as_ref()
        .and_then(|Json(b)| b.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let generated = state.store.generate_key(name)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "ok": true,
            "id": generated.id,
            "key": generated.key,
            "name": generated.name,
        })),
    )
        .into_response())
}

/// `GET /auth` - credential metadata, never secrets or hashes.
#[instrument(skip(state))]
pub async fn list_keys(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let keys = state.store.list_keys()?;
    Ok(Json(json!({"ok": true, "keys": keys})))
}

/// `DELETE /auth/:id`
#[instrument(skip(state))]
pub async fn revoke_key(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.store.revoke_key(&id)?;
    Ok(Json(json!({"ok": true})))
}

/// `POST /auth/validate` with body `{key}`. Always 200 on a well-formed
/// request; the verdict is in the `valid` field.
#[instrument(skip(state, body))]
pub async fn validate_key(
    Extension(state): Extension<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    let key = body
        .get("key")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::BadRequest("request body must include a string 'key'".into()))?;

    let valid = state.store.validate_key(key)?;
    Ok(Json(json!({"ok": true, "valid": valid})))
}
