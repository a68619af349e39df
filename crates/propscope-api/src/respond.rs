//! The response envelope shared by every GET handler: cache lookup,
//! blocking query offload under a wall-clock budget, entity-tag stamping,
//! and the conditional 304 path.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use rusqlite::Connection;
use serde::Serialize;

use propscope_cache::{etag, CachedResponse, ResponseCache};
use propscope_core::error::AnalyticsError;

use crate::error::ApiResult;
use crate::state::AppState;

/// Execute a store query on a blocking thread under the request budget.
pub async fn run_query<T, F>(state: &AppState, query: F) -> Result<T, AnalyticsError>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> propscope_core::Result<T> + Send + 'static,
{
    let store = state.store.clone();
    let task = tokio::task::spawn_blocking(move || store.with(query));
    match tokio::time::timeout(state.query_budget, task).await {
        Err(_) => Err(AnalyticsError::QueryTimeout),
        Ok(Err(join_error)) => Err(AnalyticsError::Internal(format!(
            "query task failed: {join_error}"
        ))),
        Ok(Ok(result)) => result,
    }
}

/// Serve a store-backed response: cache lookup first, then the query,
/// then entity-tag stamping and cache fill. `pool` is `None` for requests
/// that must not be cached (filters or search present); those still get
/// an entity-tag.
pub async fn respond_query<T, F>(
    state: &AppState,
    pool: Option<Arc<ResponseCache>>,
    key: String,
    if_none_match: Option<String>,
    query: F,
) -> ApiResult<Response>
where
    T: Serialize + Send + 'static,
    F: FnOnce(&Connection) -> propscope_core::Result<T> + Send + 'static,
{
    if let Some(cache) = &pool {
        if let Some(hit) = cache.get(&key) {
            return Ok(finish(hit, true, if_none_match.as_deref()));
        }
    }

    let value = run_query(state, query).await?;
    let body = serde_json::to_vec(&value).map_err(AnalyticsError::from)?;
    let cached = CachedResponse::new(body);
    if let Some(cache) = &pool {
        cache.put(key, cached.clone());
    }
    Ok(finish(cached, false, if_none_match.as_deref()))
}

/// Serve a response built without touching the store (catalog and
/// diagnostics endpoints).
pub fn respond_value<T: Serialize>(
    pool: Option<(&ResponseCache, String)>,
    if_none_match: Option<String>,
    value: &T,
) -> ApiResult<Response> {
    if let Some((cache, key)) = &pool {
        if let Some(hit) = cache.get(key) {
            return Ok(finish(hit, true, if_none_match.as_deref()));
        }
    }

    let body = serde_json::to_vec(value).map_err(AnalyticsError::from)?;
    let cached = CachedResponse::new(body);
    if let Some((cache, key)) = pool {
        cache.put(key, cached.clone());
    }
    Ok(finish(cached, false, if_none_match.as_deref()))
}

/// Stamp the validator and cache headers; suppress the body when the
/// client already holds it.
fn finish(cached: CachedResponse, cache_hit: bool, if_none_match: Option<&str>) -> Response {
    let not_modified = etag::matches(if_none_match, &cached.etag);

    let mut response = if not_modified {
        let mut r = Response::new(Body::empty());
        *r.status_mut() = StatusCode::NOT_MODIFIED;
        r
    } else {
        let mut r = Response::new(Body::from(cached.body.as_ref().clone()));
        r.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        r
    };

    let headers = response.headers_mut();
    if let Ok(tag) = HeaderValue::from_str(&cached.etag) {
        headers.insert(header::ETAG, tag);
    }
    headers.insert(
        HeaderName::from_static("x-cache"),
        HeaderValue::from_static(if cache_hit { "HIT" } else { "MISS" }),
    );
    response
}

/// Read the raw `If-None-Match` value, if the request carried one.
pub fn if_none_match(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
