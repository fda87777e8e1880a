//! Reference audio decoding.

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use symphonia::core::audio::{AudioBufferRef, SampleBuffer};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::debug;

use crate::model::Waveform;
use crate::{GenerationError, Result};

/// Decode an audio file on disk, keeping its channel layout
pub fn decode_audio_file(path: &Path) -> Result<Waveform> {
    let bytes = std::fs::read(path)?;
    if bytes.is_empty() {
        return Err(GenerationError::Decode("empty audio file".into()));
    }

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let file = File::open(path)?;
    match decode_with_symphonia(Box::new(file), &hint) {
        Ok(wav) => Ok(wav),
        Err(symphonia_err) => decode_wav_hound(&bytes).map_err(|wav_err| {
            GenerationError::Decode(format!("symphonia: {symphonia_err}; wav fallback: {wav_err}"))
        }),
    }
}

pub fn decode_audio_bytes(bytes: &[u8]) -> Result<Waveform> {
    if bytes.is_empty() {
        return Err(GenerationError::Decode("empty audio input".into()));
    }

    match decode_with_symphonia(Box::new(Cursor::new(bytes.to_vec())), &Hint::new()) {
        Ok(wav) => Ok(wav),
        Err(symphonia_err) => decode_wav_hound(bytes).map_err(|wav_err| {
            GenerationError::Decode(format!("symphonia: {symphonia_err}; wav fallback: {wav_err}"))
        }),
    }
}

fn decode_with_symphonia(source: Box<dyn MediaSource>, hint: &Hint) -> Result<Waveform> {
    let stream = MediaSourceStream::new(source, Default::default());
    let probed = get_probe()
        .format(hint, stream, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| GenerationError::Decode(format!("unrecognized container: {e}")))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| GenerationError::Decode("no default audio track".into()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);
    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| GenerationError::Decode(format!("unsupported codec: {e}")))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                return Err(GenerationError::Decode("stream reset is not supported".into()));
            }
            Err(err) => return Err(GenerationError::Decode(format!("reading packets: {err}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                debug!("Skipping corrupt packet: {e}");
                continue;
            }
            Err(err) => return Err(GenerationError::Decode(format!("decoding packet: {err}"))),
        };

        if sample_rate == 0 {
            sample_rate = decoded.spec().rate;
        }
        if channels == 0 {
            channels = decoded.spec().channels.count();
        }
        append_interleaved(decoded, &mut samples);
    }

    if sample_rate == 0 {
        return Err(GenerationError::Decode("missing sample rate".into()));
    }
    if samples.is_empty() {
        return Err(GenerationError::Decode("decoded zero samples".into()));
    }

    Ok(Waveform::new(samples, sample_rate, channels.max(1) as u16))
}

fn append_interleaved(decoded: AudioBufferRef<'_>, out: &mut Vec<f32>) {
    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
    buffer.copy_interleaved_ref(decoded);
    out.extend_from_slice(buffer.samples());
}

fn decode_wav_hound(bytes: &[u8]) -> std::result::Result<Waveform, hound::Error> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1u32 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| (v as f32 / max_val).clamp(-1.0, 1.0)))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok(Waveform::new(samples, spec.sample_rate, spec.channels))
}
