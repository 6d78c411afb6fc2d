/*!
 * # Authentication Module
 *
 * Accounts authenticate with an opaque token obtained from the login
 * endpoint and sent as `Authorization: Token <value>` (the `Bearer` scheme
 * is accepted too). The middleware resolves the token to an [`AuthUser`]
 * and stores it in the request extensions for handlers to pick up.
 */

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use crate::errors::ServiceError;
use crate::services::accounts::AccountService;

// Entity modules
pub mod auth_token;
pub mod password_reset_token;
pub mod user;

mod password;

pub use password::{hash_password, verify_password};
pub use user::UserRole;

/// Authenticated caller resolved from a bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == role
    }

    /// Fails with `Forbidden` unless the caller holds `role`.
    pub fn require_role(&self, role: UserRole, message: &str) -> Result<(), ServiceError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(message.to_string()))
        }
    }
}

impl From<&user::Model> for AuthUser {
    fn from(model: &user::Model) -> Self {
        Self {
            user_id: model.id,
            email: model.email.clone(),
            role: model.role,
        }
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication credentials were not provided")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Account is not active")]
    InactiveAccount,

    #[error("Authentication service not available")]
    ServiceUnavailable,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingToken | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::InactiveAccount => StatusCode::FORBIDDEN,
            Self::ServiceUnavailable | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::InternalError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let body = Json(serde_json::json!({
            "Status": false,
            "Errors": message,
            "request_id": crate::tracing::current_request_id().map(|rid| rid.0),
        }));

        (status, body).into_response()
    }
}

/// Pulls the token out of `Authorization: Token <t>` or `Authorization: Bearer <t>`.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        Some(token)
    } else {
        None
    }
}

/// Authentication middleware that resolves the token and inserts [`AuthUser`]
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let accounts = match request.extensions().get::<Arc<AccountService>>() {
        Some(service) => service.clone(),
        None => return AuthError::ServiceUnavailable.into_response(),
    };

    let token = match extract_token(request.headers()) {
        Some(token) => token.to_string(),
        None => return AuthError::MissingToken.into_response(),
    };

    match accounts.authenticate(&token).await {
        Ok(user) => {
            debug!(user_id = user.user_id, "authenticated request");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(ServiceError::Unauthorized(_)) => AuthError::InvalidToken.into_response(),
        Err(ServiceError::Forbidden(_)) => AuthError::InactiveAccount.into_response(),
        Err(e) => {
            error!("token lookup failed: {}", e);
            AuthError::InternalError(e.to_string()).into_response()
        }
    }
}

pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }
}
