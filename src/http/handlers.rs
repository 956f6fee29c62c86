//! API endpoint handlers

use crate::config::Config;
use crate::http::types::{
    ApiResponse, IndexPageForm, SearchParams, SearchResponse, StatisticsResponse,
};
use crate::indexing::{IndexingError, IndexingService};
use crate::search::{self, SearchError};
use crate::stats;
use crate::storage::SharedStorage;
use axum::extract::{Extension, Form, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

const DEFAULT_SEARCH_LIMIT: usize = 20;

const MSG_ALREADY_RUNNING: &str = "Индексация уже запущена";
const MSG_NOT_RUNNING: &str = "Индексация не запущена";
const MSG_EMPTY_QUERY: &str = "Задан пустой поисковый запрос";
const MSG_NOTHING_FOUND: &str = "По запросу ничего не найдено";
const MSG_OUTSIDE_SITES: &str =
    "Данная страница находится за пределами сайтов, указанных в конфигурации";
const MSG_INTERNAL_ERROR: &str = "Внутренняя ошибка сервера";

/// Shared state injected into every handler
pub struct AppState {
    pub indexing: IndexingService,
    pub storage: SharedStorage,
    pub config: Config,
}

/// `GET /api/startIndexing`
pub async fn start_indexing(Extension(state): Extension<Arc<AppState>>) -> Response {
    tracing::info!("GET /api/startIndexing");
    match state.indexing.start_indexing() {
        Ok(()) => ok(),
        Err(IndexingError::AlreadyRunning) => bad_request(MSG_ALREADY_RUNNING),
        Err(e) => internal_error(&e),
    }
}

/// `GET /api/stopIndexing`
pub async fn stop_indexing(Extension(state): Extension<Arc<AppState>>) -> Response {
    tracing::info!("GET /api/stopIndexing");
    if !state.indexing.is_indexing() {
        return bad_request(MSG_NOT_RUNNING);
    }
    state.indexing.stop_indexing();
    ok()
}

/// `GET /api/statistics`
pub async fn statistics(Extension(state): Extension<Arc<AppState>>) -> Response {
    tracing::info!("GET /api/statistics");
    match stats::collect(&state.storage, state.indexing.is_indexing()) {
        Ok(statistics) => (
            StatusCode::OK,
            Json(StatisticsResponse {
                result: true,
                statistics,
            }),
        )
            .into_response(),
        Err(e) => internal_error(&e),
    }
}

/// `POST /api/indexPage`
pub async fn index_page(
    Extension(state): Extension<Arc<AppState>>,
    Form(form): Form<IndexPageForm>,
) -> Response {
    tracing::info!(url = %form.url, "POST /api/indexPage");
    match state.indexing.index_page(&form.url).await {
        Ok(true) => ok(),
        Ok(false) => bad_request(MSG_OUTSIDE_SITES),
        Err(e) => internal_error(&e),
    }
}

/// `GET /api/search`
pub async fn search(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let query = params.query.unwrap_or_default();
    tracing::info!(
        query = %query,
        site = params.site.as_deref().unwrap_or("<all>"),
        "GET /api/search"
    );

    if query.trim().is_empty() {
        return bad_request(MSG_EMPTY_QUERY);
    }

    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let threshold = state.config.search.high_frequency_lemma_threshold;

    match search::search(
        &state.storage,
        threshold,
        &query,
        params.site.as_deref(),
        offset,
        limit,
    ) {
        Ok(results) if results.is_empty() => not_found(MSG_NOTHING_FOUND),
        Ok(results) => (
            StatusCode::OK,
            Json(SearchResponse {
                result: true,
                count: results.len(),
                data: results,
            }),
        )
            .into_response(),
        Err(SearchError::EmptyQuery) => bad_request(MSG_EMPTY_QUERY),
        Err(e) => internal_error(&e),
    }
}

fn ok() -> Response {
    (StatusCode::OK, Json(ApiResponse::ok())).into_response()
}

fn bad_request(message: &str) -> Response {
    tracing::warn!(message, "bad request");
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message))).into_response()
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(ApiResponse::error(message))).into_response()
}

fn internal_error(error: &dyn std::error::Error) -> Response {
    tracing::error!("internal error: {error}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::error(MSG_INTERNAL_ERROR)),
    )
        .into_response()
}
