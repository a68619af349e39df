//! Single-field value distributions.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde::Deserialize;

use propscope_cache::key::canonical_key;
use propscope_core::error::AnalyticsError;
use propscope_core::fields::StatField;
use propscope_query::stats::DEFAULT_STATS_LIMIT;

use crate::error::ApiResult;
use crate::handlers::parse_count;
use crate::respond::{if_none_match, respond_query};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    pub field: Option<String>,
    pub limit: Option<String>,
}

/// `GET /api/datasets/{id}/stats?field&limit`
pub async fn field_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<StatsParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    state.catalog.entry(&id)?;

    let field = match params.field.as_deref() {
        Some(name) if !name.is_empty() => StatField::parse(name)?,
        _ => return Err(AnalyticsError::invalid("field is required").into()),
    };
    let limit = parse_count(params.limit.as_deref(), DEFAULT_STATS_LIMIT, "limit")?;
    if limit < 1 {
        return Err(AnalyticsError::invalid("limit must be >= 1").into());
    }

    let key = canonical_key(
        "GET",
        &format!("/api/datasets/{id}/stats"),
        &[
            ("field".to_string(), field.column().to_string()),
            ("limit".to_string(), limit.to_string()),
        ],
    );

    respond_query(
        &state,
        Some(state.stats_cache.clone()),
        key,
        if_none_match(&headers),
        move |conn| propscope_query::stats::field_stats(conn, field, limit),
    )
    .await
}
