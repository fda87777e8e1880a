use std::sync::Arc;

use mgw_core::{HandlerResponse, JobEnvelope};
use tokio::sync::{Mutex, Notify};

use crate::handler::JobHandler;

pub struct WorkerState {
    handler: Arc<JobHandler>,
    // Jobs run one at a time per process.
    job_lock: Mutex<()>,
    refresh: Notify,
}

impl WorkerState {
    pub fn new(handler: Arc<JobHandler>) -> Self {
        Self {
            handler,
            job_lock: Mutex::new(()),
            refresh: Notify::new(),
        }
    }

    pub async fn run_job(&self, job: &JobEnvelope) -> HandlerResponse {
        let _guard = self.job_lock.lock().await;
        let response = self.handler.handle(job).await;
        if response.refresh_worker() {
            self.refresh.notify_one();
        }
        response
    }

    /// Resolves once a completed job has asked for the worker to be replaced
    pub async fn refresh_requested(&self) {
        self.refresh.notified().await;
    }
}
