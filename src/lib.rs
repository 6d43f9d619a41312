//! Inventory Ledger
//!
//! Part stock, BOM line allocations and alias groups for electronics
//! assemblies. The crate ships the authoritative REST backend, a typed HTTP
//! client for it, and the services that drive multi-request flows such as
//! auto-allocation and line removal.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod client;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod ledger;
pub mod middleware_helpers;
pub mod models;
pub mod services;
pub mod store;
pub mod tracing;

use axum::Router;
use http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::store::InventoryStore;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub store: InventoryStore,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(store: InventoryStore, config: AppConfig) -> Self {
        Self { store, config }
    }
}

/// Raised when neither explicit origins nor permissive CORS are configured.
#[derive(Debug, thiserror::Error)]
#[error("Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true")]
pub struct MissingCorsConfig;

/// Build CORS layer from config
pub fn cors_layer(cfg: &AppConfig) -> Result<CorsLayer, MissingCorsConfig> {
    let origins: Vec<HeaderValue> = cfg
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any))
    } else if cfg.should_allow_permissive_cors() {
        ::tracing::info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        Ok(CorsLayer::permissive())
    } else {
        ::tracing::error!("Missing CORS configuration detected; set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true");
        Err(MissingCorsConfig)
    }
}

/// The full application: REST routes, HTTP tracing, CORS and request ids.
pub fn build_router(state: AppState) -> Result<Router, MissingCorsConfig> {
    let cors = cors_layer(&state.config)?;
    Ok(handlers::api_routes()
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(cors)
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state))
}
