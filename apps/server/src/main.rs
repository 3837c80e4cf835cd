// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Lite Fragments Server - HTTP host for the fragment edit engine.
//!
//! Models live in memory, one writer at a time per model, optionally
//! persisted to a disk cache. Documents travel as base64 strings.
//!
//! # Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `POST /api/v1/call` - `{modelId, method, args}` envelope dispatching
//!   `newModel`, `edit`, `getModel` and `deleteModel`

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

mod config;
mod error;
mod routes;
mod services;
mod types;

use config::Config;
use services::{DiskCache, ModelStore};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ModelStore>,
    pub config: Arc<Config>,
}

/// Router with all endpoints and middleware.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.max_document_size_mb * 1024 * 1024;
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .route("/", get(routes::health::info))
        .route("/api/v1/health", get(routes::health::check))
        .route("/api/v1/call", post(routes::call::call))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                "info,tower_http=debug,ifc_lite_fragments_server=debug".into()
            }),
        )
        .pretty()
        .init();

    let config = Config::from_env();

    tracing::info!(
        port = config.port,
        cache_dir = %config.cache_dir,
        max_document_size_mb = config.max_document_size_mb,
        persist_models = config.persist_models,
        "Starting IFC-Lite Fragments Server"
    );

    let cache = if config.persist_models {
        Some(Arc::new(DiskCache::new(&config.cache_dir).await))
    } else {
        None
    };

    let state = AppState {
        store: Arc::new(ModelStore::new(cache)),
        config: Arc::new(config.clone()),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}
