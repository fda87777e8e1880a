//! MP3 encoding via libmp3lame.

use std::io::Write;
use std::path::Path;

use mp3lame_encoder::{Bitrate, Builder, FlushNoGap, InterleavedPcm, Quality};

use crate::audio::wav::read_wav;
use crate::model::Waveform;
use crate::{GenerationError, Result};

/// Transcode a WAV file into a 192 kbps MP3 at `mp3_path`
pub fn transcode_wav_to_mp3(wav_path: impl AsRef<Path>, mp3_path: impl AsRef<Path>) -> Result<()> {
    let waveform = read_wav(wav_path)?;
    let file = std::fs::File::create(mp3_path.as_ref())?;
    write_mp3_to(file, &waveform)
}

/// Encode a waveform as 192 kbps MP3 into `writer`.
///
/// LAME is driven in stereo; other layouts are converted first.
pub fn write_mp3_to<W: Write>(mut writer: W, waveform: &Waveform) -> Result<()> {
    if waveform.is_empty() {
        return Err(GenerationError::Encode("no samples to encode".into()));
    }
    let stereo = waveform.to_stereo();

    let mut encoder = Builder::new()
        .ok_or_else(|| GenerationError::Encode("failed to create LAME encoder".into()))?
        .with_num_channels(2)
        .map_err(|e| GenerationError::Encode(format!("LAME set_num_channels failed: {e:?}")))?
        .with_sample_rate(stereo.sample_rate)
        .map_err(|e| GenerationError::Encode(format!("LAME set_sample_rate failed: {e:?}")))?
        .with_brate(Bitrate::Kbps192)
        .map_err(|e| GenerationError::Encode(format!("LAME set_brate failed: {e:?}")))?
        .with_quality(Quality::Best)
        .map_err(|e| GenerationError::Encode(format!("LAME set_quality failed: {e:?}")))?
        .build()
        .map_err(|e| GenerationError::Encode(format!("LAME build failed: {e:?}")))?;

    let mut buf = Vec::new();
    buf.reserve(mp3lame_encoder::max_required_buffer_size(stereo.frames()));

    let encoded_size = encoder
        .encode(InterleavedPcm(stereo.samples.as_slice()), buf.spare_capacity_mut())
        .map_err(|e| GenerationError::Encode(format!("LAME encode failed: {e:?}")))?;
    // SAFETY: encode initialized exactly `encoded_size` bytes of spare capacity.
    unsafe { buf.set_len(encoded_size) };

    let flush_size = encoder
        .flush::<FlushNoGap>(buf.spare_capacity_mut())
        .map_err(|e| GenerationError::Encode(format!("LAME flush failed: {e:?}")))?;
    // SAFETY: flush initialized exactly `flush_size` bytes past the current length.
    unsafe { buf.set_len(buf.len() + flush_size) };

    writer.write_all(&buf)?;
    Ok(())
}
