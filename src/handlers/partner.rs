use crate::{
    auth::AuthUser, errors::ServiceError, services::price_list::ensure_uploader, AppState,
};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::{IntoResponse, Response},
    routing::post,
    Extension, Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

/// Partner endpoints; mounted behind authentication
pub fn partner_routes() -> Router<Arc<AppState>> {
    Router::new().route("/update", post(upload_price_list))
}

/// Partner uploads answer with `{status, message}` or `{status, error}`.
struct PartnerError(ServiceError);

impl From<ServiceError> for PartnerError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PartnerError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "price list upload failed");
        } else {
            warn!(error = %self.0, "price list rejected");
        }
        let body = json!({
            "status": false,
            "error": self.0.response_message(),
            "request_id": crate::tracing::current_request_id().map(|rid| rid.0),
        });
        (status, Json(body)).into_response()
    }
}

/// Imports the price list sent as the multipart field `file`.
///
/// The role is checked before the body is read.
async fn upload_price_list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, PartnerError> {
    ensure_uploader(&user)?;
    let mut multipart =
        multipart.map_err(|rejection| ServiceError::ValidationError(rejection.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::ValidationError(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServiceError::ValidationError(e.body_text()))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = upload
        .ok_or_else(|| ServiceError::ValidationError("file is required".to_string()))?;

    let summary = state
        .services
        .price_list
        .import(&user, &filename, &bytes)
        .await?;

    Ok(Json(json!({
        "status": true,
        "message": format!("Price list for '{}' imported", summary.shop),
        "summary": summary,
    })))
}
