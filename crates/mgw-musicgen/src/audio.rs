//! Audio I/O for the generation pipeline.
//!
//! Reference clips come in through [`decode`]; generated audio goes out as a
//! loudness-normalized 16-bit WAV ([`wav`]) and is then transcoded to MP3
//! ([`mp3`]).

pub mod decode;
pub mod loudness;
pub mod mp3;
pub mod wav;

pub use decode::{decode_audio_bytes, decode_audio_file};
pub use loudness::LoudnessStrategy;
pub use mp3::transcode_wav_to_mp3;
pub use wav::write_wav_normalized;
