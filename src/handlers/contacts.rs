use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::{
        status_ok, status_response, success_response, ItemsRequest, JsonBody,
    },
    services::contacts::{ContactInput, ContactUpdate},
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Extension, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Contact endpoints; mounted behind authentication
pub fn contact_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/user/contact/",
            get(list_contacts)
                .post(create_contact)
                .put(update_contact)
                .delete(delete_contacts),
        )
        .route(
            "/user/contact/{id}/",
            put(update_contact_by_id).delete(delete_contact_by_id),
        )
}

async fn list_contacts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ServiceError> {
    let contacts = state.services.contacts.list(user.user_id).await?;
    Ok(success_response(contacts))
}

async fn create_contact(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    JsonBody(payload): JsonBody<ContactInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let contact = state.services.contacts.create(user.user_id, payload).await?;
    Ok(status_response(StatusCode::CREATED, json!({ "contact": contact })))
}

/// `PUT /user/contact/` with the id in the body
async fn update_contact(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    JsonBody(payload): JsonBody<ContactUpdate>,
) -> Result<impl IntoResponse, ServiceError> {
    let contact_id = payload
        .id
        .ok_or_else(|| ServiceError::ValidationError("id is required".to_string()))?;
    let contact = state
        .services
        .contacts
        .update(user.user_id, contact_id, payload)
        .await?;
    Ok(status_ok(json!({ "contact": contact })))
}

async fn update_contact_by_id(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(contact_id): Path<i32>,
    JsonBody(payload): JsonBody<ContactUpdate>,
) -> Result<impl IntoResponse, ServiceError> {
    let contact = state
        .services
        .contacts
        .update(user.user_id, contact_id, payload)
        .await?;
    Ok(status_ok(json!({ "contact": contact })))
}

/// `DELETE /user/contact/` with `{"items": [ids]}` or `{"items": "1,2"}`
async fn delete_contacts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    JsonBody(payload): JsonBody<ItemsRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let ids = payload.ids()?;
    let deleted = state.services.contacts.delete(user.user_id, ids).await?;
    Ok(status_ok(json!({ "deleted": deleted })))
}

async fn delete_contact_by_id(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(contact_id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let deleted = state
        .services
        .contacts
        .delete(user.user_id, vec![contact_id])
        .await?;
    Ok(status_ok(json!({ "deleted": deleted })))
}
