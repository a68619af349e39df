//! Request-id middleware.
//!
//! Every request gets a v4 uuid, available to handlers as an extension
//! and echoed back in the `x-request-id` response header.

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;

#[derive(Debug, Clone)]
pub struct RequestId(pub String);

pub async fn attach_request_id(mut request: Request<Body>, next: Next) -> Response {
    let request_id = RequestId(uuid::Uuid::new_v4().to_string());
    request.extensions_mut().insert(request_id.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id.0) {
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-request-id"), value);
    }
    response
}
