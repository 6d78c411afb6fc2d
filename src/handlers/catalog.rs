use crate::{
    errors::ServiceError,
    handlers::common::success_response,
    services::catalog::ProductFilter,
    AppState,
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;

/// Open catalog endpoints
pub fn catalog_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/categories/", get(list_categories))
        .route("/shops/", get(list_shops))
        .route("/products", get(list_products))
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ServiceError> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(success_response(categories))
}

async fn list_shops(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ServiceError> {
    let shops = state.services.catalog.list_shops().await?;
    Ok(success_response(shops))
}

/// `?shop_id=&category_id=&search=`
async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ProductFilter>,
) -> Result<impl IntoResponse, ServiceError> {
    let products = state.services.catalog.list_products(filter).await?;
    Ok(success_response(products))
}
