use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobEnvelope {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub input: Option<Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Warning,
    Error,
}

/// Outcome of packaging a generated artifact.
///
/// On `Success` and `Warning` the message is the base64 payload; on `Error`
/// it is a diagnostic. A `Warning` also fills `warning` with the reason.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobResult {
    pub status: JobStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl JobResult {
    pub fn success(payload: String) -> Self {
        Self { status: JobStatus::Success, message: payload, warning: None }
    }

    pub fn warning(payload: String, reason: String) -> Self {
        Self { status: JobStatus::Warning, message: payload, warning: Some(reason) }
    }

    pub fn error(message: String) -> Self {
        Self { status: JobStatus::Error, message, warning: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum HandlerResponse {
    Failed {
        error: String,
    },
    Completed {
        #[serde(flatten)]
        result: JobResult,
        refresh_worker: bool,
    },
}

impl HandlerResponse {
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed { error: error.into() }
    }

    pub fn refresh_worker(&self) -> bool {
        matches!(self, Self::Completed { refresh_worker: true, .. })
    }
}
