//! End-to-end integration tests for the HiveDB HTTP API

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use hivedb::server::{build_router, AdminConfig, AppState, ServerConfig};
use hivedb::{FileStore, Store};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

/// Test fixture: router plus a pre-issued API key. The TempDir keeps the
/// backing files alive for the duration of the test.
struct TestApp {
    app: Router,
    key: String,
    _dir: TempDir,
}

fn build_app(admin: Option<AdminConfig>) -> TestApp {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(&dir.path().join("hive.redb")).unwrap());
    let files = Arc::new(FileStore::open(&dir.path().join("files")).unwrap());

    let key = store.generate_key(Some("test".to_string())).unwrap().key;

    let state = AppState {
        store,
        files,
        config: ServerConfig::default(),
        admin: admin.map(Arc::new),
    };
    TestApp {
        app: build_router(state),
        key,
        _dir: dir,
    }
}

fn admin_config(password: &str) -> AdminConfig {
    AdminConfig::new(
        bcrypt::hash(password, 4).unwrap(),
        "test-jwt-secret".to_string(),
        3600,
    )
}

impl TestApp {
    async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        bearer: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&value).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Request carrying the fixture's API key.
    async fn authed(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let key = self.key.clone();
        self.request(method, uri, body, Some(&key)).await
    }
}

// ===== Auth boundary =====

#[tokio::test]
async fn test_health_is_public() {
    let t = build_app(None);
    let (status, body) = t.request("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["status"], json!("healthy"));
}

#[tokio::test]
async fn test_data_routes_require_api_key() {
    let t = build_app(None);

    let (status, body) = t.request("GET", "/dbs", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["ok"], json!(false));

    let (status, _) = t.request("GET", "/dbs", None, Some("hv_wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t.authed("GET", "/dbs", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_key_management_is_public_but_validate_is_not() {
    let t = build_app(None);

    let (status, body) = t
        .request("POST", "/auth", Some(json!({"name": "ci"})), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let new_key = body["key"].as_str().unwrap().to_string();
    let new_id = body["id"].as_str().unwrap().to_string();
    assert!(new_key.starts_with("hv_"));

    // Listing is public and never exposes the secret.
    let (status, body) = t.request("GET", "/auth", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.to_string().contains(&new_key));

    // Validation needs a working key on the Authorization header.
    let (status, _) = t
        .request("POST", "/auth/validate", Some(json!({"key": &new_key})), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = t
        .authed("POST", "/auth/validate", Some(json!({"key": &new_key})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], json!(true));

    // Revocation is public; the revoked key stops validating.
    let (status, _) = t
        .request("DELETE", &format!("/auth/{}", new_id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = t
        .authed("POST", "/auth/validate", Some(json!({"key": &new_key})))
        .await;
    assert_eq!(body["valid"], json!(false));
}

#[tokio::test]
async fn test_validate_without_key_field_is_bad_request() {
    let t = build_app(None);
    let (status, _) = t.authed("POST", "/auth/validate", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ===== Namespaces =====

#[tokio::test]
async fn test_namespace_lifecycle() {
    let t = build_app(None);

    let (status, body) = t.authed("POST", "/dbs/app", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["db"], json!("app"));

    // Creating the same namespace again is a server-side failure.
    let (status, _) = t.authed("POST", "/dbs/app", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, body) = t.authed("GET", "/dbs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["databases"], json!(["app"]));

    let (status, _) = t.authed("DELETE", "/dbs/app", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = t.authed("DELETE", "/dbs/app", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_namespace_name_validation() {
    let t = build_app(None);

    let (status, _) = t.authed("POST", "/dbs/bad%20name", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t.authed("POST", "/dbs/__meta__", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ===== Documents =====

#[tokio::test]
async fn test_document_crud() {
    let t = build_app(None);
    t.authed("POST", "/dbs/app", None).await;

    let (status, body) = t
        .authed(
            "POST",
            "/dbs/app/docs",
            Some(json!({"key": "user:1", "value": {"name": "ada"}})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["key"], json!("user:1"));

    // Duplicate create conflicts.
    let (status, _) = t
        .authed(
            "POST",
            "/dbs/app/docs",
            Some(json!({"key": "user:1", "value": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = t.authed("GET", "/dbs/app/docs/user:1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], json!({"name": "ada"}));

    let (status, _) = t
        .authed(
            "PUT",
            "/dbs/app/docs/user:1",
            Some(json!({"value": {"name": "grace"}})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = t.authed("GET", "/dbs/app/docs/user:1", None).await;
    assert_eq!(body["value"], json!({"name": "grace"}));

    let (status, _) = t.authed("DELETE", "/dbs/app/docs/user:1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = t.authed("GET", "/dbs/app/docs/user:1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t
        .authed("PUT", "/dbs/app/docs/user:1", Some(json!({"value": 1})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_document_body_validation() {
    let t = build_app(None);
    t.authed("POST", "/dbs/app", None).await;

    // Missing value is a bad request even though null is a legal value.
    let (status, _) = t
        .authed("POST", "/dbs/app/docs", Some(json!({"key": "a"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t
        .authed("POST", "/dbs/app/docs", Some(json!({"value": 1})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Explicit null round-trips.
    let (status, _) = t
        .authed(
            "POST",
            "/dbs/app/docs",
            Some(json!({"key": "a", "value": null})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = t.authed("GET", "/dbs/app/docs/a", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], json!(null));
}

#[tokio::test]
async fn test_document_routes_need_existing_namespace() {
    let t = build_app(None);

    let (status, _) = t
        .authed("POST", "/dbs/ghost/docs", Some(json!({"key": "a", "value": 1})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t.authed("GET", "/dbs/ghost/docs", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_document_listing_with_prefix_and_limit() {
    let t = build_app(None);
    t.authed("POST", "/dbs/app", None).await;

    for key in ["user:1", "user:2", "user:3", "widget:1"] {
        let (status, _) = t
            .authed(
                "POST",
                "/dbs/app/docs",
                Some(json!({"key": key, "value": key})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = t.authed("GET", "/dbs/app/docs?prefix=user:", None).await;
    assert_eq!(status, StatusCode::OK);
    let docs = body["docs"].as_array().unwrap();
    assert_eq!(docs.len(), 3);
    assert_eq!(docs[0]["key"], json!("user:1"));
    assert_eq!(docs[2]["key"], json!("user:3"));

    let (_, body) = t
        .authed("GET", "/dbs/app/docs?prefix=user:&limit=2", None)
        .await;
    assert_eq!(body["docs"].as_array().unwrap().len(), 2);

    let (_, body) = t
        .authed("GET", "/dbs/app/docs?startKey=user:2&endKey=widget:1", None)
        .await;
    let docs = body["docs"].as_array().unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0]["key"], json!("user:2"));
    assert_eq!(docs[1]["key"], json!("user:3"));

    let (status, body) = t.authed("GET", "/dbs/app/docs?limit=0", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["docs"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_bad_limit_is_structured_error() {
    let t = build_app(None);
    t.authed("POST", "/dbs/app", None).await;

    let (status, body) = t.authed("GET", "/dbs/app/docs?limit=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], json!(false));
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_malformed_json_body_is_structured_error() {
    let t = build_app(None);
    t.authed("POST", "/dbs/app", None).await;

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/dbs/app/docs")
                .header("authorization", format!("Bearer {}", t.key))
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["ok"], json!(false));
    assert!(body["error"].is_string());
}

// ===== Files =====

#[tokio::test]
async fn test_bucket_and_file_round_trip() {
    let t = build_app(None);

    let (status, _) = t.authed("POST", "/buckets/media", None).await;
    assert_eq!(status, StatusCode::CREATED);

    let key = t.key.clone();
    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/buckets/media/files/a.bin")
                .header("authorization", format!("Bearer {}", key))
                .body(Body::from(&b"raw bytes"[..]))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/buckets/media/files/a.bin")
                .header("authorization", format!("Bearer {}", key))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"raw bytes");

    let (status, body) = t.authed("GET", "/buckets/media/files", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["files"][0]["name"], json!("a.bin"));
    assert_eq!(body["files"][0]["size"], json!(9));

    let (status, _) = t.authed("DELETE", "/buckets/media", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = t.authed("GET", "/buckets/media/files", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ===== Admin surface =====

#[tokio::test]
async fn test_admin_disabled_when_unconfigured() {
    let t = build_app(None);

    let (status, _) = t
        .request("POST", "/admin/login", Some(json!({"password": "x"})), None)
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = t
        .request(
            "PUT",
            "/admin/dbs/app/docs/a",
            Some(json!({"value": 1})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_admin_login_and_upsert() {
    let t = build_app(Some(admin_config("hunter2")));

    let (status, _) = t
        .request("POST", "/admin/login", Some(json!({"password": "wrong"})), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = t
        .request(
            "POST",
            "/admin/login",
            Some(json!({"password": "hunter2"})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    // Upsert without a token is rejected.
    let (status, _) = t
        .request(
            "PUT",
            "/admin/dbs/fresh/docs/a",
            Some(json!({"value": 1})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // An API key is not an admin token.
    let (status, _) = t
        .authed("PUT", "/admin/dbs/fresh/docs/a", Some(json!({"value": 1})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Upsert into a namespace that does not exist yet creates it.
    let (status, body) = t
        .request(
            "PUT",
            "/admin/dbs/fresh/docs/a",
            Some(json!({"value": {"n": 1}})),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created"], json!(true));

    // Second upsert replaces.
    let (status, body) = t
        .request(
            "PUT",
            "/admin/dbs/fresh/docs/a",
            Some(json!({"value": {"n": 2}})),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], json!(false));

    let (_, body) = t.authed("GET", "/dbs/fresh/docs/a", None).await;
    assert_eq!(body["value"], json!({"n": 2}));
}
