//! Mapping from analytics errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use propscope_core::error::AnalyticsError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler-level error wrapper. Internal detail is logged, never leaked.
#[derive(Debug)]
pub struct ApiError(pub AnalyticsError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<AnalyticsError> for ApiError {
    fn from(e: AnalyticsError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AnalyticsError::InvalidArgument(message) => {
                (StatusCode::BAD_REQUEST, message.clone())
            }
            AnalyticsError::DatasetNotFound(_) => {
                (StatusCode::NOT_FOUND, "Dataset not found".to_string())
            }
            AnalyticsError::AgentNotFound(_) => {
                (StatusCode::NOT_FOUND, "Agent not found".to_string())
            }
            AnalyticsError::QueryTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "Query exceeded budget".to_string(),
            ),
            other => {
                tracing::error!(error = %other, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApiError(AnalyticsError::invalid("bad filter")),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError(AnalyticsError::DatasetNotFound("x".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError(AnalyticsError::AgentNotFound("x".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError(AnalyticsError::QueryTimeout),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                ApiError(AnalyticsError::Internal("secret detail".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
