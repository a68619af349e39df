//! Market-insights composite.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde::Deserialize;

use propscope_cache::key::canonical_key;
use propscope_core::filter::FilterSet;
use propscope_query::insights::market_insights;

use crate::error::ApiResult;
use crate::respond::{if_none_match, respond_query};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InsightsParams {
    pub filters: Option<String>,
}

/// `GET /api/datasets/{id}/insights?filters`
pub async fn insights(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<InsightsParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    state.catalog.entry(&id)?;

    let filters = FilterSet::parse(params.filters.as_deref())?;

    let pool = params
        .filters
        .is_none()
        .then(|| state.stats_cache.clone());
    let key = canonical_key("GET", &format!("/api/datasets/{id}/insights"), &[]);

    respond_query(&state, pool, key, if_none_match(&headers), move |conn| {
        market_insights(conn, &filters)
    })
    .await
}
