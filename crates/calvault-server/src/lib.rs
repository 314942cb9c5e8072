//! Calvault server library logic.

pub mod api;
pub mod config;

use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use calvault_db::DbPool;
use config::EventsConfig;
use calvault_events::{RawEventRetrievalStrategy, SqlRawEventStrategy};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Strategy used to read calendar events.
    pub strategy: Arc<dyn RawEventRetrievalStrategy>,
    /// Page size and filter size limits for `POST /api/events`.
    pub limits: EventsConfig,
}

impl AppState {
    /// State backed by the SQL retrieval strategy.
    pub fn new(pool: DbPool, limits: EventsConfig) -> Self {
        Self {
            pool,
            strategy: Arc::new(SqlRawEventStrategy),
            limits,
        }
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/events", post(api::query_events_handler))
        .layer(Extension(Arc::new(state)))
        .layer(TraceLayer::new_for_http())
}
