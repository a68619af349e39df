//! Propscope API
//!
//! REST surface over the read-only transaction store: paginated rows,
//! multi-dimensional aggregates, time series, market insights, and agent
//! roll-ups, fronted by two response-cache pools and strong entity-tags.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod handlers;
pub mod request_id;
pub mod respond;
pub mod state;

pub use config::Config;
pub use state::AppState;

/// Build the application router with a permissive CORS policy.
pub fn router(state: AppState) -> Router {
    router_with_cors(state, CorsLayer::permissive())
}

/// Build the application router with the given CORS policy.
pub fn router_with_cors(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/datasets", get(handlers::datasets::list))
        .route("/api/datasets/{id}", get(handlers::datasets::detail))
        .route("/api/datasets/{id}/data", get(handlers::data::rows))
        .route("/api/datasets/{id}/stats", get(handlers::stats::field_stats))
        .route(
            "/api/datasets/{id}/analytics",
            get(handlers::analytics::analytics),
        )
        .route(
            "/api/datasets/{id}/timeseries",
            get(handlers::timeseries::timeseries),
        )
        .route(
            "/api/datasets/{id}/insights",
            get(handlers::insights::insights),
        )
        .route("/api/datasets/{id}/agents/top", get(handlers::agents::top))
        .route(
            "/api/datasets/{id}/agents/{reg_num}",
            get(handlers::agents::profile),
        )
        .route("/api/cache/stats", get(handlers::cache_admin::stats))
        .route("/api/cache/clear", post(handlers::cache_admin::clear_all))
        .route(
            "/api/cache/clear/{dataset_id}",
            post(handlers::cache_admin::clear_dataset),
        )
        .layer(middleware::from_fn(request_id::attach_request_id))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
