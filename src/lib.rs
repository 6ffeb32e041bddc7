pub mod config;
pub mod error;
pub mod handlers;
pub mod headers;
pub mod metrics;
pub mod models;
pub mod provider;
pub mod rate_limit;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::middleware::map_response;
use axum::routing::{any, get};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{GatewayError, ProviderError, Result};

use crate::config::LogFormat;
use crate::handlers::{gateway_handler, health_handler, metrics_handler};
use crate::headers::harden_headers;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>, endpoint: &str) -> Router {
    Router::new()
        .route(endpoint, any(gateway_handler))
        .route_layer(map_response(harden_headers))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// Setup tracing/logging, RUST_LOG wins over level
pub fn setup_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => subscriber.with(fmt::layer().json()).init(),
        LogFormat::Text => subscriber.with(fmt::layer()).init(),
    }
}
