use std::path::PathBuf;

use mgw_core::{validate_input, HandlerResponse, JobEnvelope, JobResult};
use mgw_musicgen::MelodyGenerator;
use tracing::{error, info};

use crate::packager::process_output_mp3;

/// One request/response cycle: validate, generate, package.
///
/// Every failure is turned into a response body; nothing here panics or
/// retries.
pub struct JobHandler {
    generator: MelodyGenerator,
    refresh_worker: bool,
}

impl JobHandler {
    pub fn new(generator: MelodyGenerator, refresh_worker: bool) -> Self {
        Self {
            generator,
            refresh_worker,
        }
    }

    pub async fn handle(&self, job: &JobEnvelope) -> HandlerResponse {
        let job_id = job.id.as_deref().unwrap_or("-");

        let request = match validate_input(job.input.as_ref()) {
            Ok(request) => request,
            Err(e) => {
                info!(job_id = %job_id, "Rejected input: {e}");
                return HandlerResponse::failed(e.to_string());
            }
        };

        let mp3_path = match self.generator.generate_melody(&request).await {
            Ok(path) => path,
            Err(e) => {
                error!(job_id = %job_id, "Generation failed: {e}");
                return HandlerResponse::failed(format!("Error generating mp3: {e}"));
            }
        };
        info!(job_id = %job_id, "generated mp3 file - {}", mp3_path.display());

        let result = package(mp3_path).await;

        HandlerResponse::Completed {
            result,
            refresh_worker: self.refresh_worker,
        }
    }
}

async fn package(path: PathBuf) -> JobResult {
    match tokio::task::spawn_blocking(move || process_output_mp3(&path)).await {
        Ok(result) => result,
        Err(e) => JobResult::error(format!("Failed to read and encode MP3: {e}")),
    }
}
