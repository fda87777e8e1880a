//! Intermediate WAV output.

use std::path::Path;

use tracing::warn;

use crate::audio::loudness::LoudnessStrategy;
use crate::model::Waveform;
use crate::Result;

/// Write `waveform` as 16-bit PCM after applying `strategy`.
///
/// Samples still outside [-1, 1] after normalization are clamped.
pub fn write_wav_normalized(
    path: impl AsRef<Path>,
    waveform: &Waveform,
    strategy: &LoudnessStrategy,
) -> Result<()> {
    let mut samples = waveform.samples.clone();
    strategy.apply(&mut samples, waveform.sample_rate, waveform.channels);

    let clipped = samples.iter().filter(|s| s.abs() > 1.0).count();
    if clipped > 0 {
        warn!("Clipping {clipped} samples while writing {}", path.as_ref().display());
    }

    let spec = hound::WavSpec {
        channels: waveform.channels,
        sample_rate: waveform.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for s in samples {
        writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

pub fn read_wav(path: impl AsRef<Path>) -> Result<Waveform> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1u32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok(Waveform::new(samples, spec.sample_rate, spec.channels))
}
