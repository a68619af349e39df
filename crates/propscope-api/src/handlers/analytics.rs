//! One- and two-dimension aggregates.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde::Deserialize;

use propscope_cache::key::canonical_key;
use propscope_core::error::AnalyticsError;
use propscope_core::fields::FilterField;
use propscope_core::filter::FilterSet;
use propscope_query::analytics::cross_tab;

use crate::error::ApiResult;
use crate::respond::{if_none_match, respond_query};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
    pub dimension1: Option<String>,
    pub dimension2: Option<String>,
    pub filters: Option<String>,
}

/// `GET /api/datasets/{id}/analytics?dimension1&dimension2&filters`
pub async fn analytics(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<AnalyticsParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    state.catalog.entry(&id)?;

    let dim1 = match params.dimension1.as_deref() {
        Some(name) if !name.is_empty() => FilterField::parse(name)?,
        _ => return Err(AnalyticsError::invalid("dimension1 is required").into()),
    };
    let dim2 = match params.dimension2.as_deref() {
        Some(name) if !name.is_empty() => Some(FilterField::parse(name)?),
        _ => None,
    };
    let filters = FilterSet::parse(params.filters.as_deref())?;

    let pool = params
        .filters
        .is_none()
        .then(|| state.stats_cache.clone());
    let mut query = vec![("dimension1".to_string(), dim1.column().to_string())];
    if let Some(d) = dim2 {
        query.push(("dimension2".to_string(), d.column().to_string()));
    }
    let key = canonical_key("GET", &format!("/api/datasets/{id}/analytics"), &query);

    respond_query(&state, pool, key, if_none_match(&headers), move |conn| {
        cross_tab(conn, dim1, dim2, &filters)
    })
    .await
}
