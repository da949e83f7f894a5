//! HTTP routes definition

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Json, Router,
};

use super::{admin, auth_handlers, file_handlers, handlers};

/// Data surface: namespaces and documents.
///
/// - `POST   /dbs/:name`           - Create a namespace
/// - `DELETE /dbs/:name`           - Delete a namespace (and its documents)
/// - `GET    /dbs`                 - List namespaces
/// - `POST   /dbs/:db/docs`        - Create a document
/// - `GET    /dbs/:db/docs/:id`    - Get a document
/// - `PUT    /dbs/:db/docs/:id`    - Update a document
/// - `DELETE /dbs/:db/docs/:id`    - Delete a document
/// - `GET    /dbs/:db/docs`        - Ranged listing (startKey/endKey/prefix/limit)
pub fn data_routes() -> Router {
    Router::new()
        .route("/dbs", get(handlers::list_namespaces))
        .route("/dbs/:name", post(handlers::create_namespace))
        .route("/dbs/:name", delete(handlers::delete_namespace))
        .route("/dbs/:db/docs", post(handlers::create_doc))
        .route("/dbs/:db/docs", get(handlers::list_docs))
        .route("/dbs/:db/docs/:id", get(handlers::get_doc))
        .route("/dbs/:db/docs/:id", put(handlers::update_doc))
        .route("/dbs/:db/docs/:id", delete(handlers::delete_doc))
}

/// Credential surface. Generation, listing, and revocation bootstrap
/// credential issuance and are exempt from the API-key check; validation
/// is not.
pub fn auth_routes() -> Router {
    Router::new()
        .route("/auth", post(auth_handlers::generate_key))
        .route("/auth", get(auth_handlers::list_keys))
        .route("/auth/:id", delete(auth_handlers::revoke_key))
        .route("/auth/validate", post(auth_handlers::validate_key))
}

/// File surface: buckets and raw file bodies.
pub fn file_routes() -> Router {
    Router::new()
        .route("/buckets", get(file_handlers::list_buckets))
        .route("/buckets/:name", post(file_handlers::create_bucket))
        .route("/buckets/:name", delete(file_handlers::delete_bucket))
        .route("/buckets/:bucket/files", get(file_handlers::list_files))
        .route("/buckets/:bucket/files/:name", put(file_handlers::put_file))
        .route("/buckets/:bucket/files/:name", get(file_handlers::get_file))
        .route(
            "/buckets/:bucket/files/:name",
            delete(file_handlers::delete_file),
        )
}

/// Admin surface: bcrypt login issuing a JWT, and JWT-guarded writes with
/// auto-create namespace semantics.
pub fn admin_routes() -> Router {
    Router::new()
        .route(
            "/admin/dbs/:db/docs/:id",
            put(admin::upsert_doc).route_layer(axum_middleware::from_fn(admin::require_admin_jwt)),
        )
        .route("/admin/login", post(admin::login))
}

/// Health check routes
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health))
}

/// Health check endpoint (auth-exempt)
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": true,
        "status": "healthy",
        "version": crate::VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
