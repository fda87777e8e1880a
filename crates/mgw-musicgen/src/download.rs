use std::io::Write;
use std::path::Path;

use reqwest::Url;
use tracing::{debug, info};

use crate::audio::decode_audio_file;
use crate::model::Waveform;
use crate::{GenerationError, Result};

/// Download a reference clip and decode it.
///
/// The body is staged in a temporary file that is removed once decoding
/// finishes, whether or not it succeeded.
pub async fn load_audio_from_url(client: &reqwest::Client, url: &str) -> Result<Waveform> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| GenerationError::Download(e.to_string()))?
        .error_for_status()
        .map_err(|e| GenerationError::Download(e.to_string()))?;

    let bytes = response
        .bytes()
        .await
        .map_err(|e| GenerationError::Download(e.to_string()))?;
    info!("Downloaded {} bytes of reference audio", bytes.len());

    let suffix = suffix_for(url);
    tokio::task::spawn_blocking(move || decode_staged(&std::env::temp_dir(), &suffix, &bytes))
        .await
        .map_err(|e| GenerationError::Decode(e.to_string()))?
}

fn decode_staged(dir: &Path, suffix: &str, bytes: &[u8]) -> Result<Waveform> {
    let mut staged = tempfile::Builder::new().suffix(suffix).tempfile_in(dir)?;
    staged.write_all(bytes)?;
    staged.flush()?;
    debug!("Staged reference audio at {}", staged.path().display());

    decode_audio_file(staged.path())
}

/// File suffix hinting the container format, taken from the URL path
fn suffix_for(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            Path::new(u.path())
                .extension()
                .and_then(|e| e.to_str())
                .filter(|e| !e.is_empty() && e.len() <= 5)
                .map(|e| format!(".{}", e.to_ascii_lowercase()))
        })
        .unwrap_or_else(|| ".tmp".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::io::Cursor;

    fn wav_bytes() -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..1600 {
            writer.write_sample(((i as f32 * 0.1).sin() * 8000.0) as i16).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_download_and_decode() {
        let body = wav_bytes();
        let app = Router::new().route("/clip.wav", get(move || async move { body }));
        let base = serve(app).await;

        let wav = load_audio_from_url(&reqwest::Client::new(), &format!("{base}/clip.wav"))
            .await
            .unwrap();
        assert_eq!(wav.sample_rate, 16000);
        assert_eq!(wav.frames(), 1600);
    }

    #[tokio::test]
    async fn test_non_success_status_is_download_error() {
        let app = Router::new().route("/gone.wav", get(|| async { StatusCode::NOT_FOUND }));
        let base = serve(app).await;

        let err = load_audio_from_url(&reqwest::Client::new(), &format!("{base}/gone.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Download(_)), "got {err}");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_download_error() {
        let err = load_audio_from_url(&reqwest::Client::new(), "http://127.0.0.1:9/clip.wav")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Download(_)));
    }

    #[test]
    fn test_staged_file_removed_after_decode() {
        let dir = tempfile::tempdir().unwrap();

        decode_staged(dir.path(), ".wav", &wav_bytes()).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        assert!(decode_staged(dir.path(), ".wav", b"garbage").is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_suffix_from_url() {
        assert_eq!(suffix_for("https://cdn.example.com/a/b/Track.MP3?sig=1"), ".mp3");
        assert_eq!(suffix_for("https://cdn.example.com/download"), ".tmp");
    }
}
