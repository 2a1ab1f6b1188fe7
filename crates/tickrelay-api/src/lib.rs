//! # tickrelay-api
//!
//! HTTP and WebSocket layer for TickRelay built on Axum.
//!
//! Provides the producer endpoint, status and health reporting, the
//! WebSocket upgrade and per-connection socket pump, middleware (CORS,
//! logging, panic recovery), and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{run_server, serve, shutdown_signal};
pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
