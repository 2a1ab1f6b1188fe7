//! Server bootstrap: bind, serve, and shut down gracefully.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;

use tickrelay_core::config::AppConfig;
use tickrelay_core::AppResult;
use tickrelay_core::error::AppError;

use crate::router::build_router;
use crate::state::AppState;

/// Serves the relay on `listener` until `signal` resolves.
///
/// When the signal fires, the relay stops admitting connections, closes and
/// drains the open ones, and only then lets the listener go.
pub async fn serve<F>(listener: TcpListener, state: AppState, signal: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state.clone());
    let engine = state.realtime.clone();

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        signal.await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let report = engine.shutdown().await;
        tracing::info!(
            closing = report.closing,
            closed = report.closed,
            drained = report.drained,
            timed_out = report.timed_out,
            "Relay drained"
        );
    })
    .await
    .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    tracing::info!("TickRelay server shut down gracefully");
    Ok(())
}

/// Runs the TickRelay server with the given configuration.
pub async fn run_server(config: AppConfig) -> AppResult<()> {
    tracing::info!("Starting TickRelay v{}", env!("CARGO_PKG_VERSION"));

    let addr = config.bind_address();
    let state = AppState::new(config);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("TickRelay server listening on {}", addr);

    serve(listener, state, shutdown_signal()).await
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
