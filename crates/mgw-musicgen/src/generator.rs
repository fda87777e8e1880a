use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mgw_core::{is_valid_url, GenerationParameters, GenerationRequest};
use tracing::{info, warn};
use uuid::Uuid;

use crate::audio::{transcode_wav_to_mp3, write_wav_normalized, LoudnessStrategy};
use crate::cache::ModelCache;
use crate::download::load_audio_from_url;
use crate::model::Waveform;
use crate::{GenerationError, Result};

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub output_dir: PathBuf,
    pub loudness: LoudnessStrategy,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            loudness: LoudnessStrategy::default(),
        }
    }
}

/// Turns a validated request into an MP3 on local disk
pub struct MelodyGenerator {
    models: Arc<ModelCache>,
    client: reqwest::Client,
    config: GeneratorConfig,
}

impl MelodyGenerator {
    pub fn new(models: Arc<ModelCache>, config: GeneratorConfig) -> Self {
        Self {
            models,
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Generate audio for `request` and return the path of the MP3 artifact.
    ///
    /// The caller owns the returned file and is expected to remove it.
    pub async fn generate_melody(&self, request: &GenerationRequest) -> Result<PathBuf> {
        let prompt = request.prompt_text().ok_or_else(|| {
            GenerationError::InvalidParameter(format!("prompt must be text, got {}", request.prompt))
        })?;
        let duration = request.duration_secs().ok_or_else(|| {
            GenerationError::InvalidParameter(format!("duration must be a number, got {}", request.duration))
        })?;

        let params = GenerationParameters::with_duration(duration);
        let descriptions = vec![prompt.to_string()];
        let model = self.models.get().await?;

        let outputs = match request.sample.as_deref().filter(|s| is_valid_url(s)) {
            Some(url) => {
                if !self.models.model().supports_melody() {
                    warn!("{} is not a melody checkpoint", self.models.model().id());
                }
                let melody = load_audio_from_url(&self.client, url).await?;
                info!(
                    "Generating {duration}s with chroma guidance from a {:.1}s reference",
                    melody.duration_secs()
                );
                model.generate_with_chroma(&descriptions, &melody, &params).await?
            }
            None => {
                info!("Generating {duration}s from text only");
                model.generate(&descriptions, &params).await?
            }
        };

        let waveform = outputs
            .into_iter()
            .next()
            .filter(|w| !w.is_empty())
            .ok_or_else(|| GenerationError::Model("model returned no audio".into()))?;

        let output_dir = self.config.output_dir.clone();
        let loudness = self.config.loudness;
        tokio::task::spawn_blocking(move || write_artifact(&output_dir, &waveform, &loudness))
            .await
            .map_err(|e| GenerationError::Encode(e.to_string()))?
    }
}

/// Write the waveform as `<uuid>.wav`, transcode it to `<uuid>.mp3`, and
/// remove the WAV.
fn write_artifact(output_dir: &Path, waveform: &Waveform, loudness: &LoudnessStrategy) -> Result<PathBuf> {
    write_artifact_with(
        output_dir,
        waveform,
        loudness,
        |wav, mp3| transcode_wav_to_mp3(wav, mp3),
        |p| std::fs::remove_file(p),
    )
}

/// A failed delete of the intermediate WAV is logged and the MP3 still
/// returned. A failed transcode removes both files.
fn write_artifact_with(
    output_dir: &Path,
    waveform: &Waveform,
    loudness: &LoudnessStrategy,
    transcode: impl FnOnce(&Path, &Path) -> Result<()>,
    remove: impl FnOnce(&Path) -> io::Result<()>,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let wav_path = output_dir.join(format!("{}.wav", Uuid::new_v4()));
    let mp3_path = wav_path.with_extension("mp3");

    if let Err(e) = write_wav_normalized(&wav_path, waveform, loudness) {
        remove_quietly(&wav_path);
        return Err(e);
    }

    let transcoded = transcode(&wav_path, &mp3_path);

    if let Err(e) = remove(&wav_path) {
        warn!("Unable to remove temporary file {}: {e}", wav_path.display());
    }

    if let Err(e) = transcoded {
        remove_quietly(&wav_path);
        remove_quietly(&mp3_path);
        return Err(e);
    }

    Ok(mp3_path)
}

fn remove_quietly(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Unable to remove {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MelodyModel, ModelLoader};
    use async_trait::async_trait;
    use axum::routing::get;
    use axum::Router;
    use mgw_core::MusicGenModel;
    use serde_json::json;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Calls {
        loads: AtomicUsize,
        plain: AtomicUsize,
        chroma: AtomicUsize,
    }

    struct SineModel {
        calls: Arc<Calls>,
        fail: bool,
    }

    impl SineModel {
        fn render(&self, params: &GenerationParameters) -> Result<Vec<Waveform>> {
            if self.fail {
                return Err(GenerationError::Model("CUDA out of memory".into()));
            }
            let frames = (params.duration * 32000.0) as usize;
            let samples = (0..frames)
                .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 32000.0).sin() * 0.3)
                .collect();
            Ok(vec![Waveform::new(samples, 32000, 1)])
        }
    }

    #[async_trait]
    impl MelodyModel for SineModel {
        fn sample_rate(&self) -> u32 {
            32000
        }

        async fn generate(&self, _: &[String], params: &GenerationParameters) -> Result<Vec<Waveform>> {
            self.calls.plain.fetch_add(1, Ordering::SeqCst);
            self.render(params)
        }

        async fn generate_with_chroma(
            &self,
            _: &[String],
            melody: &Waveform,
            params: &GenerationParameters,
        ) -> Result<Vec<Waveform>> {
            assert!(!melody.is_empty());
            self.calls.chroma.fetch_add(1, Ordering::SeqCst);
            self.render(params)
        }
    }

    struct SineLoader {
        calls: Arc<Calls>,
        fail: bool,
    }

    #[async_trait]
    impl ModelLoader for SineLoader {
        async fn load(&self, _: &MusicGenModel) -> Result<Arc<dyn MelodyModel>> {
            self.calls.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(SineModel { calls: self.calls.clone(), fail: self.fail }))
        }
    }

    fn generator(dir: &Path, fail: bool) -> (MelodyGenerator, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let loader = Arc::new(SineLoader { calls: calls.clone(), fail });
        let cache = Arc::new(ModelCache::new(MusicGenModel::default(), loader));
        let config = GeneratorConfig {
            output_dir: dir.join("outputs"),
            loudness: LoudnessStrategy::default(),
        };
        (MelodyGenerator::new(cache, config), calls)
    }

    fn request(value: serde_json::Value) -> GenerationRequest {
        serde_json::from_value(value).unwrap()
    }

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_text_only_generation_leaves_only_mp3() {
        let dir = tempfile::tempdir().unwrap();
        let (generator, calls) = generator(dir.path(), false);

        let req = request(json!({"prompt": "calm piano", "duration": 1, "sample": null}));
        let path = generator.generate_melody(&req).await.unwrap();

        assert_eq!(path.extension().unwrap(), "mp3");
        assert!(path.starts_with(dir.path().join("outputs")));
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        assert_eq!(files_in(&dir.path().join("outputs")), vec![path.clone()]);
        assert_eq!(calls.plain.load(Ordering::SeqCst), 1);
        assert_eq!(calls.chroma.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_model_is_loaded_once_across_requests() {
        let dir = tempfile::tempdir().unwrap();
        let (generator, calls) = generator(dir.path(), false);
        let req = request(json!({"prompt": "drums", "duration": 0.5, "sample": null}));

        let a = generator.generate_melody(&req).await.unwrap();
        let b = generator.generate_melody(&req).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(calls.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sample_url_uses_chroma_guidance() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..8000 {
            writer.write_sample(((i as f32 * 0.07).sin() * 9000.0) as i16).unwrap();
        }
        writer.finalize().unwrap();
        let body = cursor.into_inner();

        let app = Router::new().route("/ref.wav", get(move || async move { body }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let (generator, calls) = generator(dir.path(), false);
        let req = request(json!({
            "prompt": "lofi",
            "duration": 1,
            "sample": format!("http://{addr}/ref.wav"),
        }));

        let path = generator.generate_melody(&req).await.unwrap();
        assert!(path.exists());
        assert_eq!(calls.chroma.load(Ordering::SeqCst), 1);
        assert_eq!(calls.plain.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_download_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (generator, calls) = generator(dir.path(), false);
        let req = request(json!({
            "prompt": "lofi",
            "duration": 1,
            "sample": "http://127.0.0.1:9/ref.wav",
        }));

        let err = generator.generate_melody(&req).await.unwrap_err();
        assert!(matches!(err, GenerationError::Download(_)), "got {err}");
        assert_eq!(calls.chroma.load(Ordering::SeqCst), 0);
        assert!(files_in(&dir.path().join("outputs")).is_empty());
    }

    #[tokio::test]
    async fn test_non_numeric_duration_fails_before_loading() {
        let dir = tempfile::tempdir().unwrap();
        let (generator, calls) = generator(dir.path(), false);
        let req = request(json!({"prompt": "lofi", "duration": "long", "sample": null}));

        let err = generator.generate_melody(&req).await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidParameter(_)));
        assert!(err.to_string().contains("duration"));
        assert_eq!(calls.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let (generator, _) = generator(dir.path(), true);
        let req = request(json!({"prompt": "lofi", "duration": 1, "sample": null}));

        let err = generator.generate_melody(&req).await.unwrap_err();
        assert!(err.to_string().contains("CUDA out of memory"));
    }

    fn tone() -> Waveform {
        let samples = (0..16000).map(|i| (i as f32 * 0.05).sin() * 0.4).collect();
        Waveform::new(samples, 32000, 1)
    }

    #[test]
    fn test_failed_wav_delete_still_returns_mp3() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = dir.path().join("outputs");

        let mp3 = write_artifact_with(
            &outputs,
            &tone(),
            &LoudnessStrategy::default(),
            |wav, mp3| transcode_wav_to_mp3(wav, mp3),
            |_| Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only")),
        )
        .unwrap();

        assert!(std::fs::metadata(&mp3).unwrap().len() > 0);
        assert!(mp3.with_extension("wav").exists());
    }

    #[test]
    fn test_failed_transcode_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = dir.path().join("outputs");

        let err = write_artifact_with(
            &outputs,
            &tone(),
            &LoudnessStrategy::default(),
            |_, mp3| {
                std::fs::write(mp3, b"partial")?;
                Err(GenerationError::Encode("lame: buffer too small".into()))
            },
            |p| std::fs::remove_file(p),
        )
        .unwrap_err();

        assert!(matches!(err, GenerationError::Encode(_)));
        assert!(outputs.exists());
        assert!(files_in(&outputs).is_empty());
    }

    #[tokio::test]
    async fn test_zero_duration_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (generator, _) = generator(dir.path(), false);
        let req = request(json!({"prompt": "lofi", "duration": 0, "sample": null}));

        let err = generator.generate_melody(&req).await.unwrap_err();
        assert!(matches!(err, GenerationError::Model(_)));
        assert!(files_in(&dir.path().join("outputs")).is_empty());
    }
}
