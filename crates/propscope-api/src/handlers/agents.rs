//! Agent roll-ups and profiles.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde::Deserialize;

use propscope_cache::key::canonical_key;
use propscope_core::filter::FilterSet;
use propscope_query::agents::{agent_profile, top_agents, DEFAULT_AGENT_LIMIT};

use crate::error::ApiResult;
use crate::handlers::parse_count;
use crate::respond::{if_none_match, respond_query};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TopAgentsParams {
    pub limit: Option<String>,
    pub filters: Option<String>,
    pub search: Option<String>,
}

/// `GET /api/datasets/{id}/agents/top?limit&filters&search`
pub async fn top(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<TopAgentsParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    state.catalog.entry(&id)?;

    let filters = FilterSet::parse(params.filters.as_deref())?;
    let limit = parse_count(params.limit.as_deref(), DEFAULT_AGENT_LIMIT, "limit")?;
    let search = params.search.clone();

    // Search terms are as uncacheable as filters: unbounded key space.
    let cacheable = params.filters.is_none() && params.search.is_none();
    let pool = cacheable.then(|| state.stats_cache.clone());
    let key = canonical_key(
        "GET",
        &format!("/api/datasets/{id}/agents/top"),
        &[("limit".to_string(), limit.to_string())],
    );

    respond_query(&state, pool, key, if_none_match(&headers), move |conn| {
        top_agents(conn, limit, &filters, search.as_deref())
    })
    .await
}

/// `GET /api/datasets/{id}/agents/{regNum}`
pub async fn profile(
    State(state): State<AppState>,
    Path((id, reg_num)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    state.catalog.entry(&id)?;

    let key = canonical_key(
        "GET",
        &format!("/api/datasets/{id}/agents/{reg_num}"),
        &[],
    );

    respond_query(
        &state,
        Some(state.stats_cache.clone()),
        key,
        if_none_match(&headers),
        move |conn| agent_profile(conn, &reg_num),
    )
    .await
}
