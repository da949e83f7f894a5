//! Admin surface: bcrypt-verified login issuing a short-lived JWT, and a
//! JWT-guarded document upsert that may create the target namespace.

use axum::{
    extract::{rejection::JsonRejection, Extension, Json, Path, Request},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::server::handlers::ApiError;
use crate::server::AppState;
use crate::storage::WritePolicy;

/// Admin authentication settings. When absent from [`AppState`], the whole
/// admin surface answers 503.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// bcrypt hash of the admin password.
    pub password_hash: String,
    /// HMAC secret for signing admin tokens.
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub token_ttl_secs: i64,
}

impl AdminConfig {
    pub fn new(password_hash: String, jwt_secret: String, token_ttl_secs: i64) -> Self {
        Self {
            password_hash,
            jwt_secret,
            token_ttl_secs,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

fn disabled_response() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"ok": false, "error": "admin surface is not configured"})),
    )
        .into_response()
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"ok": false, "error": message})),
    )
        .into_response()
}

/// `POST /admin/login` with body `{password}`. On success returns a bearer
/// token for the admin routes.
#[instrument(skip(state, body))]
pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let admin = match &state.admin {
        Some(admin) => admin,
        None => return Ok(disabled_response()),
    };

    let password = body
        .get("password")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ApiError::BadRequest("request body must include a string 'password'".into())
        })?;

    let verified = bcrypt::verify(password, &admin.password_hash).unwrap_or(false);
    if !verified {
        warn!("Admin login rejected");
        return Ok(unauthorized_response("invalid password"));
    }

    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: "admin".to_string(),
        iat: now,
        exp: now + admin.token_ttl_secs,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(admin.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Store(crate::error::Error::Engine(e.to_string())))?;

    Ok(Json(json!({
        "ok": true,
        "token": token,
        "expiresIn": admin.token_ttl_secs,
    }))
    .into_response())
}

/// Route-level guard for the admin surface: requires a bearer JWT signed
/// with the configured secret and not yet expired.
pub async fn require_admin_jwt(
    Extension(state): Extension<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let admin = match &state.admin {
        Some(admin) => admin.clone(),
        None => return disabled_response(),
    };

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let token = match token {
        Some(token) => token,
        None => return unauthorized_response("missing admin token"),
    };

    let validation = Validation::new(Algorithm::HS256);
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(admin.jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(_) => next.run(req).await,
        Err(e) => {
            warn!(error = %e, "Admin token rejected");
            unauthorized_response("invalid admin token")
        }
    }
}

/// `PUT /admin/dbs/:db/docs/:id` with body `{value}`. Creates the document
/// if absent, replaces it if present, and creates the namespace on the fly.
/// Returns 201 when the document was created, 200 when replaced.
#[instrument(skip(state, body))]
pub async fn upsert_doc(
    Extension(state): Extension<Arc<AppState>>,
    Path((db, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let value = body
        .get("value")
        .ok_or_else(|| ApiError::BadRequest("request body must include 'value'".into()))?;

    let policy = WritePolicy {
        auto_create_namespace: true,
    };
    let created = state.store.upsert_doc(&db, &id, value, policy)?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(json!({"ok": true, "key": id, "created": created}))).into_response())
}
