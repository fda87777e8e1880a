use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use mgw_core::JobEnvelope;
use uuid::Uuid;

use crate::server::schemas::{HealthResponse, RunStatus, RunSyncResponse};
use crate::server::state::WorkerState;

pub async fn run_sync(
    State(state): State<Arc<WorkerState>>,
    Json(mut job): Json<JobEnvelope>,
) -> Json<RunSyncResponse> {
    let id = job
        .id
        .get_or_insert_with(|| format!("local-{}", Uuid::new_v4()))
        .clone();

    let output = state.run_job(&job).await;

    Json(RunSyncResponse {
        id,
        status: RunStatus::Completed,
        output,
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
