use std::env;
use std::path::PathBuf;

use mgw_core::{is_valid_url, MusicGenModel};
use mgw_musicgen::Url;

use crate::error::ConfigError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000";
const DEFAULT_OUTPUT_DIR: &str = "outputs";

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub host: String,
    pub port: u16,
    /// Ask the hosting runtime to replace this worker after every job
    pub refresh_worker: bool,
    pub model_endpoint: Url,
    pub model: MusicGenModel,
    pub output_dir: PathBuf,
}

impl WorkerConfig {
    /// Load from the environment, after applying an optional `.env`
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Ok(Self::from_lookup(|key| env::var(key).ok())?)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let refresh_worker = lookup("REFRESH_WORKER")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "PORT",
                expected: "a port number",
                value: raw.clone(),
            })?,
            None => DEFAULT_PORT,
        };

        let host = lookup("HOST")
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let endpoint = lookup("MUSICGEN_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let model_endpoint = Url::parse(endpoint.trim())
            .ok()
            .filter(|url| is_valid_url(url.as_str()))
            .ok_or_else(|| ConfigError::InvalidValue {
                name: "MUSICGEN_ENDPOINT",
                expected: "an absolute URL",
                value: endpoint.clone(),
            })?;

        let model = lookup("MUSICGEN_MODEL")
            .map(|id| MusicGenModel::from_id(id.trim()))
            .unwrap_or_default();

        let output_dir = lookup("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        Ok(Self {
            host,
            port,
            refresh_worker,
            model_endpoint,
            model,
            output_dir,
        })
    }

    /// Command-line values win over the environment
    pub fn with_overrides(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
