//! Cache diagnostics and flush endpoints.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::respond::{if_none_match, respond_value};
use crate::state::AppState;

/// `GET /api/cache/stats`: hit-rate diagnostics for both pools.
/// Never cached, but still carries a validator like every other GET.
pub async fn stats(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let body = json!({
        "api": state.api_cache.stats(),
        "stats": state.stats_cache.stats(),
    });
    respond_value(None, if_none_match(&headers), &body)
}

/// `POST /api/cache/clear`: drop both pools.
pub async fn clear_all(State(state): State<AppState>) -> Json<Value> {
    let cleared = state.api_cache.clear() + state.stats_cache.clear();
    tracing::info!(cleared, "cache cleared");
    Json(json!({
        "message": "Cache cleared",
        "entriesCleared": cleared,
    }))
}

/// `POST /api/cache/clear/{datasetId}`: drop entries for one dataset.
pub async fn clear_dataset(
    State(state): State<AppState>,
    Path(dataset_id): Path<String>,
) -> Json<Value> {
    let fragment = format!("/api/datasets/{dataset_id}");
    let cleared =
        state.api_cache.invalidate(&fragment) + state.stats_cache.invalidate(&fragment);
    tracing::info!(dataset = %dataset_id, cleared, "dataset cache cleared");
    Json(json!({
        "message": format!("Cache cleared for dataset {dataset_id}"),
        "entriesCleared": cleared,
    }))
}
