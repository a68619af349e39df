//! Liveness probe.

use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::json;

use crate::error::ApiResult;
use crate::respond::{if_none_match, respond_value};

pub async fn health(headers: HeaderMap) -> ApiResult<Response> {
    let body = json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    respond_value(None, if_none_match(&headers), &body)
}
