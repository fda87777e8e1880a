mod routes;
mod schemas;
mod state;

use std::sync::Arc;

use axum::extract::Request;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span};

use crate::config::WorkerConfig;
use crate::handler::JobHandler;
use crate::server::routes::api_routes;
use crate::server::state::WorkerState;

pub fn router(state: Arc<WorkerState>) -> Router {
    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        info_span!("http_request", method = %request.method(), uri = %request.uri())
    });

    Router::new()
        .merge(api_routes())
        .layer(trace_layer)
        .with_state(state)
}

/// Serve jobs until a shutdown signal arrives or a job asks for a refresh
pub async fn serve(config: &WorkerConfig, handler: Arc<JobHandler>) -> anyhow::Result<()> {
    let state = Arc::new(WorkerState::new(handler));
    let app = router(state.clone());

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!("Worker listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    info!("Worker stopped");
    Ok(())
}

async fn shutdown_signal(state: Arc<WorkerState>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
        _ = state.refresh_requested() => info!("Job requested a worker refresh, shutting down..."),
    }
}
