mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};

#[tokio::test]
async fn health_reports_database_and_build_info() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = response_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["database"], "healthy");
    assert!(body["version"].is_string());
    assert!(body["git"].is_string());
}

#[tokio::test]
async fn incoming_request_id_is_echoed_in_errors() {
    let app = TestApp::new().await;

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/v1/user/login")
        .header("content-type", "application/json")
        .header("x-request-id", "trace-me-123")
        .body(axum::body::Body::from(
            r#"{"email": "ghost@example.com", "password": "whatever1"}"#,
        ))
        .unwrap();
    let response = app.send_raw(request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "trace-me-123"
    );
    let body = response_json(response).await;
    assert_eq!(body["request_id"], "trace-me-123");
    assert_eq!(body["error"], "Unauthorized");
}
