//! Router tests against an in-memory ledger and a mocked object store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use mockall::mock;
use serde_json::{json, Value};
use tower::ServiceExt;

use nw_api::{create_router, ApiConfig, AppState};
use nw_ledger::InMemoryUsageStore;
use nw_models::SessionId;
use nw_storage::{ObjectStore, StorageResult};

mock! {
    pub Store {}

    #[async_trait]
    impl ObjectStore for Store {
        async fn presign_put(
            &self,
            key: &str,
            content_type: &str,
            expires_in: Duration,
        ) -> StorageResult<String>;
        async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String>;
        async fn exists(&self, key: &str) -> StorageResult<bool>;
        async fn check_connectivity(&self) -> StorageResult<()>;
    }
}

fn create_test_router(store: MockStore) -> Router {
    let config = ApiConfig {
        rate_limit_rps: 1000,
        ..ApiConfig::default()
    };
    let state = AppState::from_parts(config, Arc::new(store), Arc::new(InMemoryUsageStore::new()));
    create_router(state, None)
}

fn post_json(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn use_feature(cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/api/use-feature");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("sessionId="))
        .map(|v| v.to_string())
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_router(MockStore::new());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_ready_checks_storage_and_ledger() {
    let mut store = MockStore::new();
    store.expect_check_connectivity().returning(|| Ok(()));
    let app = create_test_router(store);

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["checks"]["storage"]["status"], "ok");
    assert_eq!(body["checks"]["ledger"]["status"], "ok");
}

#[tokio::test]
async fn test_first_request_sets_session_cookie() {
    let app = create_test_router(MockStore::new());

    let response = app.oneshot(use_feature(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).expect("session cookie");
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=604800"));

    let value = cookie
        .trim_start_matches("sessionId=")
        .split(';')
        .next()
        .unwrap();
    assert!(SessionId::parse(value).is_ok());

    let body = json_body(response).await;
    assert_eq!(body["message"], "Feature used successfully. Attempt #1");
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_existing_cookie_is_not_reissued() {
    let app = create_test_router(MockStore::new());
    let cookie = format!("sessionId={}", SessionId::new());

    let response = app.oneshot(use_feature(Some(&cookie))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_none());
}

#[tokio::test]
async fn test_third_attempt_is_forbidden() {
    let app = create_test_router(MockStore::new());
    let cookie = format!("sessionId={}", SessionId::new());

    for attempt in 1..=2 {
        let response = app.clone().oneshot(use_feature(Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["count"], attempt);
    }

    let response = app.clone().oneshot(use_feature(Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        json_body(response).await["message"],
        "Usage limit reached. Please sign up to continue."
    );

    // A different session still has its own quota
    let other = format!("sessionId={}", SessionId::new());
    let response = app.oneshot(use_feature(Some(&other))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_presigned_url_issues_fresh_key() {
    let mut store = MockStore::new();
    store
        .expect_presign_put()
        .withf(|key, content_type, _| key.starts_with("videos/") && content_type == "video/mp4")
        .times(1)
        .returning(|key, _, _| Ok(format!("https://bucket.test/{}?X-Amz-Signature=abc", key)));
    let app = create_test_router(store);

    let response = app
        .oneshot(post_json(
            "/api/get-presigned-url",
            None,
            json!({"fileName": "demo.mp4", "fileType": "video/mp4"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let key = body["key"].as_str().unwrap();
    let stamp = key
        .strip_prefix("videos/")
        .and_then(|rest| rest.strip_suffix("_demo.mp4"))
        .unwrap();
    assert!(stamp.parse::<i64>().is_ok());
    assert!(body["uploadURL"].as_str().unwrap().contains(key));
}

#[tokio::test]
async fn test_presigned_url_missing_file_type() {
    let app = create_test_router(MockStore::new());

    let response = app
        .oneshot(post_json(
            "/api/get-presigned-url",
            None,
            json!({"fileName": "demo.mp4"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["message"],
        "Missing required fields: fileName or fileType"
    );
}

#[tokio::test]
async fn test_presigned_url_rejects_malformed_body() {
    let app = create_test_router(MockStore::new());

    let request = Request::builder()
        .method("POST")
        .uri("/api/get-presigned-url")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_markdown_not_ready() {
    let mut store = MockStore::new();
    store
        .expect_exists()
        .withf(|key| key == "documents/1700000000000_demo.md")
        .returning(|_| Ok(false));
    let app = create_test_router(store);

    let response = app
        .oneshot(post_json(
            "/api/get-generated-markdown-url",
            None,
            json!({"fileName": "1700000000000_demo"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["message"], "Markdown not ready yet.");
}

#[tokio::test]
async fn test_markdown_ready() {
    let mut store = MockStore::new();
    store.expect_exists().returning(|_| Ok(true));
    store
        .expect_presign_get()
        .withf(|key, _| key == "documents/1700000000000_demo.md")
        .returning(|key, _| Ok(format!("https://bucket.test/{}", key)));
    let app = create_test_router(store);

    let response = app
        .oneshot(post_json(
            "/api/get-generated-markdown-url",
            None,
            json!({"fileName": "1700000000000_demo"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await["markdownURL"],
        "https://bucket.test/documents/1700000000000_demo.md"
    );
}

#[tokio::test]
async fn test_markdown_rejects_traversal() {
    let app = create_test_router(MockStore::new());

    let response = app
        .oneshot(post_json(
            "/api/get-generated-markdown-url",
            None,
            json!({"fileName": "../secrets"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_markdown_missing_file_name() {
    let app = create_test_router(MockStore::new());

    let response = app
        .oneshot(post_json("/api/get-generated-markdown-url", None, json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["message"],
        "Missing required field: fileName"
    );
}
