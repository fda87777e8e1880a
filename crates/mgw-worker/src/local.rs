//! One-shot local mode: run a single job from a JSON file and exit.

use std::path::{Path, PathBuf};

use anyhow::Context;
use mgw_core::{HandlerResponse, JobEnvelope};
use tracing::info;

use crate::handler::JobHandler;

pub const DEFAULT_TEST_INPUT: &str = "test_input.json";

/// `test_input.json` in the working directory, if present
pub fn default_test_input() -> Option<PathBuf> {
    let path = PathBuf::from(DEFAULT_TEST_INPUT);
    path.is_file().then_some(path)
}

pub async fn run_test_input(handler: &JobHandler, path: &Path) -> anyhow::Result<HandlerResponse> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut job: JobEnvelope =
        serde_json::from_str(&raw).with_context(|| format!("{} is not a job envelope", path.display()))?;
    job.id.get_or_insert_with(|| "local_test".to_string());

    info!("Running test input from {}", path.display());
    Ok(handler.handle(&job).await)
}
