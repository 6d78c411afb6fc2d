use crate::{
    errors::ServiceError,
    handlers::common::{status_ok, status_response, JsonBody},
    services::accounts::{
        ConfirmRequest, LoginRequest, PasswordResetConfirm, PasswordResetRequest, RegisterRequest,
    },
    AppState,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Router,
};
use serde_json::json;
use std::sync::Arc;

/// Open account endpoints under `/user`
pub fn account_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/register/confirm", post(confirm_registration))
        .route("/login", post(login))
        .route("/password_reset", post(request_password_reset))
        .route("/password_reset/confirm", post(confirm_password_reset))
}

async fn register(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let account = state.services.accounts.register(payload).await?;
    Ok(status_response(StatusCode::CREATED, json!({ "user": account })))
}

async fn confirm_registration(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<ConfirmRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.accounts.confirm(payload).await?;
    Ok(status_ok(json!({})))
}

async fn login(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let token = state.services.accounts.login(payload).await?;
    Ok(status_ok(json!({ "Token": token })))
}

async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<PasswordResetRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.accounts.request_password_reset(payload).await?;
    Ok(status_ok(json!({})))
}

async fn confirm_password_reset(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<PasswordResetConfirm>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.accounts.confirm_password_reset(payload).await?;
    Ok(status_ok(json!({})))
}
