//! Retail API library
//!
//! Ordering backend for an online marketplace: partner shops upload price
//! lists, buyers browse the catalog, fill a basket and place orders.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod migrator;
pub mod notifications;
pub mod services;
pub mod tracing;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    response::Json,
    routing::get,
    Extension, Router,
};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};

use crate::auth::AuthRouterExt;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

/// Every `/api/v1` route. Account and catalog routes are open; the rest
/// require a token.
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    let protected = Router::new()
        .nest("/partner", handlers::partner::partner_routes())
        .merge(handlers::basket::basket_routes())
        .merge(handlers::orders::order_routes())
        .merge(handlers::contacts::contact_routes())
        .with_auth();

    Router::new()
        .nest("/user", handlers::accounts::account_routes())
        .merge(handlers::catalog::catalog_routes())
        .merge(protected)
}

/// CORS from configuration. Configuration validation guarantees that outside
/// development either origins or the explicit opt-in are present.
pub fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .filter_map(|origin| HeaderValue::from_str(origin).ok())
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.should_allow_permissive_cors() {
        ::tracing::info!(
            development = cfg.is_development(),
            "using permissive CORS because no explicit origins were configured"
        );
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}

/// Full application router with the middleware stack applied.
pub fn build_router(state: AppState) -> Router {
    let max_body_size = state.config.max_body_size;
    let cors = cors_layer(&state.config);
    let accounts = state.services.accounts.clone();

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes())
        .layer(DefaultBodyLimit::max(max_body_size))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors)
        // Inject the account service for the auth middleware
        .layer(Extension(accounts))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            crate::tracing::request_id_middleware,
        ))
        .with_state(Arc::new(state))
}

async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let database = match db::check_connection(&state.db).await {
        Ok(()) => "healthy",
        Err(e) => {
            ::tracing::warn!(error = %e, "health check: database unreachable");
            "unhealthy"
        }
    };
    let healthy = database == "healthy";

    let body = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "checks": {
            "database": database,
        },
        "version": env!("CARGO_PKG_VERSION"),
        "git": option_env!("GIT_HASH").unwrap_or("unknown"),
        "build_time": option_env!("BUILD_TIME").unwrap_or("unknown"),
        "environment": state.config.environment,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}
