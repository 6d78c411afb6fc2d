use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::{status_ok, success_response, FlexibleId, JsonBody},
    AppState,
};
use axum::{
    extract::State,
    response::IntoResponse,
    routing::get,
    Extension, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Order endpoints; mounted behind authentication
pub fn order_routes() -> Router<Arc<AppState>> {
    Router::new().route("/order/", get(list_orders).post(place_order))
}

#[derive(Debug, Deserialize)]
struct CheckoutRequest {
    contact: Option<FlexibleId>,
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ServiceError> {
    let orders = state.services.orders.list_orders(user.user_id).await?;
    Ok(success_response(orders))
}

/// Turns the basket into an order delivered to `contact`.
async fn place_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    JsonBody(payload): JsonBody<CheckoutRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let contact_id = payload.contact.as_ref().map(FlexibleId::parse).transpose()?;
    let order = state.services.orders.checkout(&user, contact_id).await?;
    Ok(status_ok(json!({ "order": order })))
}
