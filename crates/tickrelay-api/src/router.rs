//! Route definitions for the TickRelay HTTP API.
//!
//! The router receives `AppState` and passes it to all handlers via Axum's
//! `State` extractor.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.server.max_body_bytes;
    let cors = middleware::cors::build_cors_layer(&state.config.server.cors);

    let api_routes = Router::new()
        .route("/ticker", post(handlers::ticker::submit_ticker))
        .route("/status", get(handlers::status::status));

    let ws_routes = Router::new()
        .route("/", get(handlers::ws::ws_upgrade))
        .route("/ws", get(handlers::ws::ws_upgrade))
        .route("/ws-info", get(handlers::health::ws_info));

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .fallback(handlers::fallback::not_found)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(CompressionLayer::new())
        .layer(middleware::panic::build_panic_layer())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}
