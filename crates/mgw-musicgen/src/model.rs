use std::sync::Arc;

use async_trait::async_trait;
use mgw_core::{GenerationParameters, MusicGenModel};

use crate::Result;

/// Decoded audio held in host memory.
///
/// `samples` are interleaved `f32` in [-1, 1] (`[L, R, L, R, ...]` for stereo).
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self { samples, sample_rate, channels: channels.max(1) }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Two-channel copy: mono is duplicated, wider layouts are averaged
    pub fn to_stereo(&self) -> Waveform {
        if self.channels == 2 {
            return self.clone();
        }
        let channels = self.channels as usize;
        let samples = self
            .samples
            .chunks(channels)
            .flat_map(|frame| {
                let mono = frame.iter().sum::<f32>() / frame.len() as f32;
                [mono, mono]
            })
            .collect();
        Waveform::new(samples, self.sample_rate, 2)
    }
}

/// A loaded generative model.
///
/// Implementations are shared across requests once loaded, so generation
/// parameters are passed per call instead of being set on the model.
#[async_trait]
pub trait MelodyModel: Send + Sync {
    fn sample_rate(&self) -> u32;

    async fn generate(
        &self,
        descriptions: &[String],
        params: &GenerationParameters,
    ) -> Result<Vec<Waveform>>;

    /// Generation guided by the chroma of a reference clip
    async fn generate_with_chroma(
        &self,
        descriptions: &[String],
        melody: &Waveform,
        params: &GenerationParameters,
    ) -> Result<Vec<Waveform>>;
}

/// Produces a [`MelodyModel`] for a checkpoint id
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, model: &MusicGenModel) -> Result<Arc<dyn MelodyModel>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_and_duration() {
        let wav = Waveform::new(vec![0.0; 32000 * 2], 32000, 2);
        assert_eq!(wav.frames(), 32000);
        assert!((wav.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mono_to_stereo() {
        let wav = Waveform::new(vec![0.1, -0.2, 0.3], 16000, 1);
        let stereo = wav.to_stereo();
        assert_eq!(stereo.channels, 2);
        assert_eq!(stereo.samples, vec![0.1, 0.1, -0.2, -0.2, 0.3, 0.3]);
    }

    #[test]
    fn test_multichannel_downmixes_to_stereo() {
        let wav = Waveform::new(vec![0.3, 0.6, 0.0], 16000, 3);
        let stereo = wav.to_stereo();
        assert_eq!(stereo.frames(), 1);
        assert!((stereo.samples[0] - 0.3).abs() < 1e-6);
    }
}
