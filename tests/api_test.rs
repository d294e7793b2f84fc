//! HTTP API tests driving the router in-process

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use skillswap_search::{
    api::{build_router, AppState},
    search::{SearchConfig, SearchService},
    state::create_in_memory_store,
};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

fn create_test_app() -> (Router, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = SearchConfig {
        index_path: temp_dir.path().to_path_buf(),
        writer_heap_size: 20_000_000,
        ..Default::default()
    };

    let service = Arc::new(SearchService::with_store(config, create_in_memory_store()));
    (build_router(AppState::new(service)), temp_dir)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

#[tokio::test]
async fn test_health_check() {
    let (app, _temp_dir) = create_test_app();

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["search"], "uninitialized");

    send(&app, Method::POST, "/api/search/setup", None).await;
    let (_, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(body["search"], "ready");
}

#[tokio::test]
async fn test_create_then_search() {
    let (app, _temp_dir) = create_test_app();

    let (status, body) = send(&app, Method::POST, "/api/search/setup", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["stats"]["total_documents"], 0);

    let (status, forum) = send(
        &app,
        Method::POST,
        "/api/forums",
        Some(json!({
            "title": "Photography",
            "description": "Composition, light and editing",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = forum["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::GET, "/api/search?q=photgraphy", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "photgraphy");
    assert_eq!(body["total"], 1);
    assert_eq!(body["results"][0]["id"], id.as_str());
    assert_eq!(body["results"][0]["posts"], 0);

    let (status, body) = send(&app, Method::GET, "/api/search", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_update_and_delete_keep_index_in_sync() {
    let (app, _temp_dir) = create_test_app();
    send(&app, Method::POST, "/api/search/setup", None).await;

    let (_, forum) = send(
        &app,
        Method::POST,
        "/api/forums",
        Some(json!({ "title": "Knitting", "description": "Patterns and yarn" })),
    )
    .await;
    let uri = format!("/api/forums/{}", forum["id"].as_str().unwrap());

    let (status, updated) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "title": "Pottery", "posts": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Pottery");
    assert_eq!(updated["posts"], 3);

    let (_, body) = send(&app, Method::GET, "/api/search?q=pottery", None).await;
    assert_eq!(body["total"], 1);
    let (_, body) = send(&app, Method::GET, "/api/search?q=knitting", None).await;
    assert_eq!(body["total"], 0);

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, Method::GET, "/api/search?q=pottery", None).await;
    assert_eq!(body["total"], 0);

    let (status, _) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_forums() {
    let (app, _temp_dir) = create_test_app();

    for title in ["Chess", "Go", "Bridge"] {
        send(
            &app,
            Method::POST,
            "/api/forums",
            Some(json!({ "title": title, "description": "Strategy games" })),
        )
        .await;
    }

    let (status, body) = send(&app, Method::GET, "/api/forums?page=0&page_size=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["forums"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_error_responses() {
    let (app, _temp_dir) = create_test_app();

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/forums/{}", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/forums",
        Some(json!({ "title": "", "description": "No title" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // No index has been set up yet
    let (status, body) = send(&app, Method::GET, "/api/search?q=chess", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "Search failed");
}

#[tokio::test]
async fn test_setup_rejects_malformed_body() {
    let (app, _temp_dir) = create_test_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/search/setup",
        Some(json!({ "delete_existin": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/search/setup",
        Some(json!({ "delete_existing": "yes" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nothing was set up by the rejected requests
    let (_, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(body["search"], "uninitialized");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/search/setup",
        Some(json!({ "delete_existing": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_reconcile_and_stats() {
    let (app, _temp_dir) = create_test_app();
    send(&app, Method::POST, "/api/search/setup", None).await;

    send(
        &app,
        Method::POST,
        "/api/forums",
        Some(json!({ "title": "Climbing", "description": "Bouldering and ropes" })),
    )
    .await;

    let (status, body) = send(&app, Method::POST, "/api/search/reconcile", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["indexed"], 1);
    assert_eq!(body["removed"], 0);

    let (status, body) = send(&app, Method::GET, "/api/search/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_documents"], 1);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _temp_dir) = create_test_app();
    send(&app, Method::GET, "/health", None).await;

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
