//! MusicGen served by an HTTP inference sidecar.
//!
//! The sidecar owns the weights and the accelerator; this side only ships
//! prompts and reference clips over and reads WAV bodies back into host
//! memory.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use mgw_core::{GenerationParameters, MusicGenModel};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audio::decode_audio_bytes;
use crate::model::{MelodyModel, ModelLoader, Waveform};
use crate::{GenerationError, Result};

#[derive(Debug, Serialize)]
struct LoadRequest<'a> {
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoadResponse {
    model: String,
    sample_rate: u32,
}

#[derive(Debug, Serialize)]
struct MelodyInput {
    sample_rate: u32,
    channels: u16,
    wav_base64: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    descriptions: &'a [String],
    #[serde(flatten)]
    params: &'a GenerationParameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    melody: Option<MelodyInput>,
}

/// Loads checkpoints on a remote inference service
pub struct RemoteLoader {
    client: reqwest::Client,
    endpoint: Url,
}

impl RemoteLoader {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            endpoint,
        }
    }
}

#[async_trait]
impl ModelLoader for RemoteLoader {
    async fn load(&self, model: &MusicGenModel) -> Result<Arc<dyn MelodyModel>> {
        let load_error = |reason: String| GenerationError::ModelLoad {
            model: model.id().to_string(),
            reason,
        };

        let url = join(&self.endpoint, "models/load").map_err(load_error)?;
        let response = self
            .client
            .post(url)
            .json(&LoadRequest { model: model.id() })
            .send()
            .await
            .map_err(|e| load_error(format!("failed to reach inference service: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(load_error(format!("HTTP {status}: {body}")));
        }

        let loaded: LoadResponse = response
            .json()
            .await
            .map_err(|e| load_error(format!("failed to parse response: {e}")))?;

        Ok(Arc::new(RemoteMusicGen {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            model: loaded.model,
            sample_rate: loaded.sample_rate,
        }))
    }
}

pub struct RemoteMusicGen {
    client: reqwest::Client,
    endpoint: Url,
    model: String,
    sample_rate: u32,
}

impl RemoteMusicGen {
    async fn request(
        &self,
        descriptions: &[String],
        params: &GenerationParameters,
        melody: Option<MelodyInput>,
    ) -> Result<Vec<Waveform>> {
        let url = join(&self.endpoint, "generate").map_err(GenerationError::Model)?;
        let body = GenerateRequest {
            model: &self.model,
            descriptions,
            params,
            melody,
        };

        debug!("Requesting {} description(s) from {}", descriptions.len(), self.model);
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Model(format!("failed to reach inference service: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Model(format!("HTTP {status}: {body}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GenerationError::Model(format!("failed to read response: {e}")))?;

        Ok(vec![decode_audio_bytes(&bytes)?])
    }
}

#[async_trait]
impl MelodyModel for RemoteMusicGen {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn generate(
        &self,
        descriptions: &[String],
        params: &GenerationParameters,
    ) -> Result<Vec<Waveform>> {
        self.request(descriptions, params, None).await
    }

    async fn generate_with_chroma(
        &self,
        descriptions: &[String],
        melody: &Waveform,
        params: &GenerationParameters,
    ) -> Result<Vec<Waveform>> {
        let melody = MelodyInput {
            sample_rate: melody.sample_rate,
            channels: melody.channels,
            wav_base64: base64::engine::general_purpose::STANDARD.encode(encode_float_wav(melody)?),
        };
        self.request(descriptions, params, Some(melody)).await
    }
}

fn join(endpoint: &Url, path: &str) -> std::result::Result<Url, String> {
    let mut base = endpoint.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path).map_err(|e| e.to_string())
}

fn encode_float_wav(waveform: &Waveform) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: waveform.channels,
        sample_rate: waveform.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
    for &s in &waveform.samples {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}
