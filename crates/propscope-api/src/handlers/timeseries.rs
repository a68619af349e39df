//! Time-series bucketing.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde::Deserialize;

use propscope_cache::key::canonical_key;
use propscope_core::fields::FilterField;
use propscope_core::filter::FilterSet;
use propscope_core::period::Period;
use propscope_query::timeseries::time_series;

use crate::error::ApiResult;
use crate::respond::{if_none_match, respond_query};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TimeseriesParams {
    pub period: Option<String>,
    #[serde(rename = "groupBy")]
    pub group_by: Option<String>,
    pub filters: Option<String>,
}

/// `GET /api/datasets/{id}/timeseries?period&groupBy&filters`
pub async fn timeseries(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<TimeseriesParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    state.catalog.entry(&id)?;

    let period = Period::parse(params.period.as_deref())?;
    let group_by = match params.group_by.as_deref() {
        Some(name) if !name.is_empty() => Some(FilterField::parse(name)?),
        _ => None,
    };
    let filters = FilterSet::parse(params.filters.as_deref())?;

    let pool = params
        .filters
        .is_none()
        .then(|| state.stats_cache.clone());
    let mut query = vec![("period".to_string(), period.as_str().to_string())];
    if let Some(g) = group_by {
        query.push(("groupBy".to_string(), g.column().to_string()));
    }
    let key = canonical_key("GET", &format!("/api/datasets/{id}/timeseries"), &query);

    respond_query(&state, pool, key, if_none_match(&headers), move |conn| {
        time_series(conn, period, group_by, &filters)
    })
    .await
}
