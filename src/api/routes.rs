use crate::api::{handlers, AppState};
use crate::metrics::track_metrics;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        // Search
        .route("/api/search", get(handlers::search_forums))
        .route("/api/search/setup", post(handlers::setup_index))
        .route("/api/search/reconcile", post(handlers::reconcile_index))
        .route("/api/search/stats", get(handlers::index_stats))
        // Forum management
        .route(
            "/api/forums",
            post(handlers::create_forum).get(handlers::list_forums),
        )
        .route(
            "/api/forums/:id",
            get(handlers::get_forum)
                .put(handlers::update_forum)
                .delete(handlers::delete_forum),
        )
        // Add state
        .with_state(state)
        // Add middleware
        .layer(middleware::from_fn(track_metrics))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
