//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint against the in-memory
//! hash store.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use redis_hash_cache::{
    api::create_router, AppState, CacheService, MemoryHashStore, RecordCodec, TableResolver,
    TypeRegistry,
};
use serde_json::Value;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> Router {
    let service = CacheService::new(
        Arc::new(MemoryHashStore::new()),
        RecordCodec::new(TypeRegistry::with_builtins()),
        TableResolver::default(),
    );
    create_router(AppState::new(service))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn put_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == SET Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json(
            "/tables/users/records",
            r#"{"key":"u1","value":{"name":"Ada"}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "u1");
    assert_eq!(json["written"], true);
}

#[tokio::test]
async fn test_set_if_not_exists_skips_existing() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json("/tables/users/records", r#"{"key":"u1","value":1}"#))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(put_json(
            "/tables/users/records",
            r#"{"key":"u1","value":2,"condition":"ifNotExists"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["written"], false);

    let response = app
        .oneshot(empty("GET", "/tables/users/records/u1"))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["value"], 1);
}

#[tokio::test]
async fn test_set_endpoint_empty_key() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json("/tables/users/records", r#"{"key":"","value":"v"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_set_endpoint_invalid_json() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json("/tables/users/records", "{not json"))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

// == Batch Endpoint Tests ==

#[tokio::test]
async fn test_batch_set_then_read_each() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(put_json(
            "/tables/users/batch",
            r#"{"records":[{"key":"a","value":"x"},{"key":"b","value":[1,2,3]}]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 2);

    let response = app
        .oneshot(empty("GET", "/tables/users/records/b"))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["value"], serde_json::json!([1, 2, 3]));
    assert_eq!(json["typeName"], "serde_json::Value");
}

#[tokio::test]
async fn test_batch_rejects_blank_key() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json(
            "/tables/users/batch",
            r#"{"records":[{"key":"a","value":1},{"key":" ","value":2}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_record_keyed_batch_is_reachable() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json("/tables/users/records", r#"{"key":"batch","value":7}"#))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(empty("GET", "/tables/users/records/batch"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["value"], 7);

    let response = app
        .clone()
        .oneshot(empty("DELETE", "/tables/users/records/batch"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(empty("GET", "/tables/users/records/batch"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == GET Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_returns_envelope() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json(
            "/tables/users/records",
            r#"{"key":"u1","value":"hello","lifetimeSecs":600}"#,
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(empty("GET", "/tables/users/records/u1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "u1");
    assert_eq!(json["value"], "hello");
    assert_eq!(json["lifetime"], "00:10:00");
    assert!(json["setDate"].is_string());
    assert!(json["expiryDate"].is_string());
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let app = create_test_app();

    let response = app
        .oneshot(empty("GET", "/tables/users/records/nonexistent"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("nonexistent"));
}

#[tokio::test]
async fn test_get_endpoint_expired_record_is_not_found() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json(
            "/tables/users/records",
            r#"{"key":"short","value":"v","lifetimeSecs":1}"#,
        ))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let response = app
        .oneshot(empty("GET", "/tables/users/records/short"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == DELETE Endpoint Tests ==

#[tokio::test]
async fn test_delete_endpoint_success() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json("/tables/users/records", r#"{"key":"gone","value":1}"#))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(empty("DELETE", "/tables/users/records/gone"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(empty("GET", "/tables/users/records/gone"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_endpoint_missing_key_is_ok() {
    let app = create_test_app();

    let response = app
        .oneshot(empty("DELETE", "/tables/users/records/never"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// == POP Endpoint Tests ==

#[tokio::test]
async fn test_pop_endpoint_returns_and_removes() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json("/tables/jobs/records", r#"{"key":"j1","value":"work"}"#))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(empty("POST", "/tables/jobs/records/j1/pop"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["value"], "work");

    let response = app
        .oneshot(empty("POST", "/tables/jobs/records/j1/pop"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == SWEEP Endpoint Tests ==

#[tokio::test]
async fn test_sweep_endpoint_reports_count() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json(
            "/tables/users/batch",
            r#"{"records":[
                {"key":"a","value":1,"lifetimeSecs":1},
                {"key":"b","value":2,"lifetimeSecs":1},
                {"key":"c","value":3}
            ]}"#,
        ))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let response = app
        .oneshot(empty("POST", "/tables/users/sweep"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["tableId"], "users");
    assert_eq!(json["deleted"], 2);
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let response = app.oneshot(empty("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}

#[tokio::test]
async fn test_unknown_route() {
    let app = create_test_app();

    let response = app.oneshot(empty("GET", "/unknown")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
