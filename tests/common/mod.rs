#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use retail_api::{
    config::AppConfig,
    db::{self, DbConfig},
    handlers::AppServices,
    notifications::InMemoryNotifier,
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const PASSWORD: &str = "correct-horse-42";
pub const ADMIN_EMAIL: &str = "ops@example.com";
const BOUNDARY: &str = "retail-api-test-boundary";

/// Price list used across the tests: one shop, two categories, two offers.
pub const ACME_PRICE_LIST: &str = r#"
shop: Acme
categories:
  - id: 1
    name: Widgets
  - id: 2
    name: Gadgets
goods:
  - id: 100
    category: 1
    model: w-1
    name: Widget
    price: 100
    price_rrc: 120
    quantity: 10
    parameters:
      Color: red
      Weight (g): 250
  - id: 101
    category: 2
    name: Gizmo Gadget
    price: 250
    price_rrc: 300
    quantity: 3
"#;

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Application wired to a private in-memory SQLite database and an
/// in-memory mail outbox.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub notifier: InMemoryNotifier,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.cors_allow_any_origin = true;
        cfg.mail_transport = "memory".to_string();
        cfg.admin_email = ADMIN_EMAIL.to_string();

        let pool = db::establish_connection_with_config(&DbConfig::in_memory())
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let notifier = InMemoryNotifier::new();
        let services = AppServices::new(db_arc.clone(), Arc::new(notifier.clone()), &cfg);
        let state = AppState {
            db: db_arc,
            config: cfg,
            services,
        };
        let router = retail_api::build_router(state.clone());

        Self {
            router,
            state,
            notifier,
        }
    }

    pub async fn send_raw(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// JSON request with an optional `Authorization: Token` header.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Token {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send_raw(builder.body(body).expect("failed to build request"))
            .await
    }

    /// Uploads `content` as the multipart field `file`.
    pub async fn upload(&self, token: &str, filename: &str, content: &[u8]) -> Response {
        let mut payload = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        payload.extend_from_slice(content);
        payload.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/partner/update")
            .header("authorization", format!("Token {}", token))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(payload))
            .expect("failed to build upload request");
        self.send_raw(request).await
    }

    pub async fn register(&self, email: &str, account_type: &str) -> Response {
        self.request(
            Method::POST,
            "/api/v1/user/register",
            Some(json!({
                "first_name": "Test",
                "last_name": "User",
                "email": email,
                "company": "Test Co",
                "position": "Manager",
                "password": PASSWORD,
                "password_repeat": PASSWORD,
                "type": account_type,
            })),
            None,
        )
        .await
    }

    /// Most recent single-line token mailed to `email`.
    pub fn mailed_token(&self, email: &str) -> String {
        self.notifier
            .sent_to(email)
            .iter()
            .rev()
            .find_map(|message| {
                message
                    .body
                    .lines()
                    .map(str::trim)
                    .find(|line| line.len() == 32 && line.chars().all(|c| c.is_ascii_alphanumeric()))
                    .map(str::to_string)
            })
            .expect("no token mailed")
    }

    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.request(
            Method::POST,
            "/api/v1/user/login",
            Some(json!({ "email": email, "password": password })),
            None,
        )
        .await
    }

    /// Registers, confirms and logs in; returns the bearer token.
    pub async fn active_user(&self, email: &str, account_type: &str) -> String {
        let response = self.register(email, account_type).await;
        assert_eq!(response.status(), StatusCode::CREATED, "registration failed");

        let token = self.mailed_token(email);
        let response = self
            .request(
                Method::POST,
                "/api/v1/user/register/confirm",
                Some(json!({ "email": email, "token": token })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "confirmation failed");

        let response = self.login(email, PASSWORD).await;
        assert_eq!(response.status(), StatusCode::OK, "login failed");
        response_json(response).await["Token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    /// Shop account with the Acme price list already imported.
    pub async fn seeded_shop(&self) -> String {
        let token = self.active_user("partner@acme.test", "shop").await;
        let response = self
            .upload(&token, "acme.yaml", ACME_PRICE_LIST.as_bytes())
            .await;
        assert_eq!(response.status(), StatusCode::OK, "seed import failed");
        token
    }

    pub async fn create_contact(&self, token: &str) -> i32 {
        let response = self
            .request(
                Method::POST,
                "/api/v1/user/contact/",
                Some(json!({
                    "city": "Springfield",
                    "street": "Evergreen Terrace",
                    "house": "742",
                    "phone": "+1 555 0100",
                })),
                Some(token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "contact creation failed");
        response_json(response).await["contact"]["id"]
            .as_i64()
            .expect("contact id") as i32
    }

    /// Offer id of the product called `name`.
    pub async fn offer_id(&self, name: &str) -> i32 {
        let response = self
            .request(Method::GET, "/api/v1/products", None, None)
            .await;
        let products = response_json(response).await;
        products
            .as_array()
            .expect("product list")
            .iter()
            .find(|p| p["product"]["name"] == name)
            .and_then(|p| p["id"].as_i64())
            .unwrap_or_else(|| panic!("no offer named {name}")) as i32
    }
}
