//! Flat API-key middleware.
//!
//! Every request outside the exempt set must carry `Authorization: Bearer
//! <key>` where the key hashes to a stored credential. The admin subtree is
//! exempt here because it carries its own JWT guard.

use axum::{
    extract::{Extension, Request},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::server::AppState;

/// Endpoints reachable without an API key. Key management itself is exempt
/// so that the first credential can be bootstrapped; `/auth/validate` is
/// not, since it exists to check keys on behalf of authenticated callers.
fn is_public_endpoint(method: &Method, path: &str) -> bool {
    if path == "/health" {
        return true;
    }
    if path == "/auth" && (method == Method::POST || method == Method::GET) {
        return true;
    }
    if method == Method::DELETE && path.starts_with("/auth/") && path != "/auth/validate" {
        return true;
    }
    // The admin subtree has its own JWT guard.
    path == "/admin/login" || path.starts_with("/admin/")
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"ok": false, "error": message})),
    )
        .into_response()
}

pub async fn require_api_key(
    Extension(state): Extension<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    if is_public_endpoint(req.method(), req.uri().path()) {
        return next.run(req).await;
    }

    let key = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let key = match key {
        Some(key) => key,
        None => {
            warn!(path = %req.uri().path(), "Request without API key");
            return unauthorized("missing API key");
        }
    };

    match state.store.validate_key(key) {
        Ok(true) => next.run(req).await,
        Ok(false) => {
            warn!(path = %req.uri().path(), "Invalid API key");
            unauthorized("invalid API key")
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"ok": false, "error": e.to_string()})),
        )
            .into_response(),
    }
}
