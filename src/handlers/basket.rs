use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::{status_ok, success_response, ItemsRequest, JsonBody},
    services::basket::BasketItemInput,
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

/// Basket endpoints; mounted behind authentication
pub fn basket_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/basket",
        get(view_basket).post(update_basket).delete(remove_from_basket),
    )
}

/// Basket lines arrive as a JSON array or as a JSON-encoded string of one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BasketItems {
    List(Vec<BasketItemInput>),
    Encoded(String),
}

#[derive(Debug, Deserialize)]
struct BasketUpdateRequest {
    items: Option<BasketItems>,
}

impl BasketUpdateRequest {
    fn into_items(self) -> Result<Vec<BasketItemInput>, ServiceError> {
        match self.items {
            Some(BasketItems::List(items)) => Ok(items),
            Some(BasketItems::Encoded(raw)) => serde_json::from_str(&raw).map_err(|e| {
                ServiceError::ValidationError(format!("items is not a valid list: {}", e))
            }),
            None => Err(ServiceError::ValidationError("items are required".to_string())),
        }
    }
}

async fn view_basket(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ServiceError> {
    let basket = state.services.basket.view_basket(user.user_id).await?;
    Ok(success_response(basket))
}

async fn update_basket(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    JsonBody(payload): JsonBody<BasketUpdateRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let items = payload.into_items()?;
    let result = state.services.basket.add_items(user.user_id, items).await?;
    Ok(status_ok(json!({
        "updated": result.updated,
        "removed": result.removed,
    })))
}

async fn remove_from_basket(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    JsonBody(payload): JsonBody<ItemsRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let ids = payload.ids()?;
    let deleted = state.services.basket.remove_items(user.user_id, ids).await?;
    Ok(status_ok(json!({ "deleted": deleted })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_may_be_json_encoded() {
        let request: BasketUpdateRequest = serde_json::from_str(
            r#"{"items": "[{\"product_info\": 3, \"quantity\": 2}]"}"#,
        )
        .unwrap();
        let items = request.into_items().unwrap();
        assert_eq!(items[0].product_info, Some(3));
        assert_eq!(items[0].quantity, Some(2));
    }

    #[test]
    fn broken_encoded_items_are_rejected() {
        let request: BasketUpdateRequest = serde_json::from_str(r#"{"items": "[{"}"#).unwrap();
        assert!(matches!(
            request.into_items(),
            Err(ServiceError::ValidationError(_))
        ));
    }
}
