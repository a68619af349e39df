//! Dataset catalog endpoints.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::{json, Value};

use propscope_cache::key::canonical_key;
use propscope_core::error::AnalyticsError;
use propscope_store::StoreMetadata;

use crate::error::ApiResult;
use crate::respond::{if_none_match, respond_value, run_query};
use crate::state::AppState;

/// `GET /api/datasets`: the catalog listing.
pub async fn list(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let key = canonical_key("GET", "/api/datasets", &[]);
    respond_value(
        Some((state.api_cache.as_ref(), key)),
        if_none_match(&headers),
        state.catalog.as_ref(),
    )
}

/// `GET /api/datasets/{id}`: catalog entry merged with the optional
/// metadata snapshot; falls back to the store's `metadata` table when the
/// snapshot carries none.
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let entry = state.catalog.entry(&id)?.clone();
    let snapshot = state.catalog.snapshot(&id)?;

    let metadata = match snapshot.metadata {
        Some(value) => value,
        None => {
            let meta: StoreMetadata = run_query(&state, StoreMetadata::read).await?;
            serde_json::to_value(meta).map_err(AnalyticsError::from)?
        }
    };

    let body = json!({
        "id": entry.id,
        "name": entry.name,
        "description": entry.description,
        "metadata": metadata,
        "schema": snapshot.schema.unwrap_or(Value::Null),
        "visualizationRecommendations": snapshot
            .visualization_recommendations
            .unwrap_or(Value::Null),
    });

    let key = canonical_key("GET", &format!("/api/datasets/{id}"), &[]);
    respond_value(
        Some((state.api_cache.as_ref(), key)),
        if_none_match(&headers),
        &body,
    )
}
