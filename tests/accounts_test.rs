//! Registration, confirmation, login and password reset over HTTP.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn registration_mails_a_token_and_leaves_account_inactive() {
    let app = TestApp::new().await;

    let response = app.register("ann@example.com", "buyer").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["Status"], true);
    assert_eq!(body["user"]["email"], "ann@example.com");
    assert_eq!(body["user"]["role"], "buyer");

    let mails = app.notifier.sent_to("ann@example.com");
    assert_eq!(mails.len(), 1);
    assert_eq!(app.mailed_token("ann@example.com").len(), 32);

    let response = app.login("ann@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response_json(response).await;
    assert_eq!(body["Status"], false);
}

#[tokio::test]
async fn registration_rejects_bad_input() {
    let app = TestApp::new().await;

    let mismatch = app
        .request(
            Method::POST,
            "/api/v1/user/register",
            Some(json!({
                "first_name": "Ann",
                "last_name": "Lee",
                "email": "ann@example.com",
                "company": "Acme",
                "position": "Buyer",
                "password": PASSWORD,
                "password_repeat": "something-else",
            })),
            None,
        )
        .await;
    assert_eq!(mismatch.status(), StatusCode::BAD_REQUEST);

    let missing = app
        .request(
            Method::POST,
            "/api/v1/user/register",
            Some(json!({ "email": "bob@example.com" })),
            None,
        )
        .await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    let body = response_json(missing).await;
    assert_eq!(body["Status"], false);
    assert!(body["Errors"].as_str().is_some());

    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = TestApp::new().await;
    assert_eq!(
        app.register("ann@example.com", "buyer").await.status(),
        StatusCode::CREATED
    );
    assert_eq!(
        app.register("ANN@example.com", "buyer").await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn confirmation_is_single_use() {
    let app = TestApp::new().await;
    app.register("ann@example.com", "buyer").await;
    let token = app.mailed_token("ann@example.com");

    let wrong = app
        .request(
            Method::POST,
            "/api/v1/user/register/confirm",
            Some(json!({ "email": "ann@example.com", "token": "nope" })),
            None,
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::BAD_REQUEST);

    let confirm = || {
        app.request(
            Method::POST,
            "/api/v1/user/register/confirm",
            Some(json!({ "email": "ann@example.com", "token": token })),
            None,
        )
    };
    assert_eq!(confirm().await.status(), StatusCode::OK);
    assert_eq!(confirm().await.status(), StatusCode::BAD_REQUEST);

    let unknown = app
        .request(
            Method::POST,
            "/api/v1/user/register/confirm",
            Some(json!({ "email": "ghost@example.com", "token": token })),
            None,
        )
        .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn login_returns_the_same_token_every_time() {
    let app = TestApp::new().await;
    let first = app.active_user("ann@example.com", "buyer").await;

    let response = app.login("ann@example.com", PASSWORD).await;
    let body = response_json(response).await;
    assert_eq!(body["Status"], true);
    assert_eq!(body["Token"], first.as_str());
    assert_eq!(first.len(), 40);

    let bad = app.login("ann@example.com", "wrong-password").await;
    assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = TestApp::new().await;

    let anonymous = app.request(Method::GET, "/api/v1/basket", None, None).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let forged = app
        .request(Method::GET, "/api/v1/basket", None, Some("not-a-real-token"))
        .await;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(forged).await;
    assert_eq!(body["Status"], false);

    let token = app.active_user("ann@example.com", "buyer").await;
    let ok = app
        .request(Method::GET, "/api/v1/basket", None, Some(&token))
        .await;
    assert_eq!(ok.status(), StatusCode::OK);
}

#[tokio::test]
async fn password_reset_round_trip() {
    let app = TestApp::new().await;
    app.active_user("ann@example.com", "buyer").await;

    let unknown = app
        .request(
            Method::POST,
            "/api/v1/user/password_reset",
            Some(json!({ "email": "ghost@example.com" })),
            None,
        )
        .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let response = app
        .request(
            Method::POST,
            "/api/v1/user/password_reset",
            Some(json!({ "email": "ann@example.com" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let reset_token = app.mailed_token("ann@example.com");

    let redeem = || {
        app.request(
            Method::POST,
            "/api/v1/user/password_reset/confirm",
            Some(json!({ "token": reset_token, "password": "brand-new-secret" })),
            None,
        )
    };
    assert_eq!(redeem().await.status(), StatusCode::OK);
    // used tokens are rejected
    assert_eq!(redeem().await.status(), StatusCode::BAD_REQUEST);

    assert_eq!(
        app.login("ann@example.com", PASSWORD).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.login("ann@example.com", "brand-new-secret").await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn failed_confirmation_mail_does_not_keep_the_account() {
    let app = TestApp::new().await;
    app.notifier.set_failing(true);
    assert_eq!(
        app.register("ann@example.com", "buyer").await.status(),
        StatusCode::BAD_GATEWAY
    );

    app.notifier.set_failing(false);
    assert_eq!(
        app.register("ann@example.com", "buyer").await.status(),
        StatusCode::CREATED
    );
}
