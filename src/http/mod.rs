//! HTTP API
//!
//! Five endpoints under `/api`: start/stop indexing, statistics,
//! single-page reindex and search. Errors are rendered as
//! `{result: false, error}` with the matching status code.

mod handlers;
mod types;

pub use handlers::AppState;
pub use types::{ApiResponse, SearchResponse, StatisticsResponse};

use axum::routing::{get, post};
use axum::{Extension, Router};
use std::sync::Arc;

/// Builds the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/startIndexing", get(handlers::start_indexing))
        .route("/api/stopIndexing", get(handlers::stop_indexing))
        .route("/api/statistics", get(handlers::statistics))
        .route("/api/indexPage", post(handlers::index_page))
        .route("/api/search", get(handlers::search))
        .layer(Extension(state))
}
