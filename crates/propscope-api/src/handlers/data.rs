//! Paginated raw rows.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde::Deserialize;

use propscope_cache::key::canonical_key;
use propscope_core::filter::FilterSet;
use propscope_query::rows::{fetch_rows, DEFAULT_PAGE_SIZE};

use crate::error::ApiResult;
use crate::handlers::parse_count;
use crate::respond::{if_none_match, respond_query};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DataParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub filters: Option<String>,
}

/// `GET /api/datasets/{id}/data?page&limit&filters`
pub async fn rows(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DataParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    state.catalog.entry(&id)?;

    let filters = FilterSet::parse(params.filters.as_deref())?;
    let page = parse_count(params.page.as_deref(), 1, "page")?;
    let limit = parse_count(params.limit.as_deref(), DEFAULT_PAGE_SIZE, "limit")?;

    // Filtered requests bypass the cache: the key space is unbounded and
    // would crowd out the common hits.
    let pool = params
        .filters
        .is_none()
        .then(|| state.api_cache.clone());
    let key = canonical_key(
        "GET",
        &format!("/api/datasets/{id}/data"),
        &[
            ("page".to_string(), page.to_string()),
            ("limit".to_string(), limit.to_string()),
        ],
    );

    respond_query(&state, pool, key, if_none_match(&headers), move |conn| {
        fetch_rows(conn, &filters, page, limit)
    })
    .await
}
