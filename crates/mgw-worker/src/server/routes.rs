use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::server::routes::job::{health, run_sync};
use crate::server::state::WorkerState;

mod job;

pub fn api_routes() -> Router<Arc<WorkerState>> {
    Router::new()
        .route("/runsync", post(run_sync))
        .route("/health", get(health))
}
