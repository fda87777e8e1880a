//! Loudness normalization (ITU-R BS.1770 integrated loudness).

use std::f64::consts::PI;

/// Below this RMS energy a clip is treated as silence and left untouched.
const MIN_ENERGY: f64 = 2e-3;

const BLOCK_SECS: f64 = 0.4;
const BLOCK_OVERLAP: f64 = 0.75;
const ABSOLUTE_GATE_LUFS: f64 = -70.0;
const RELATIVE_GATE_LU: f64 = -10.0;

/// Normalize to a target loudness of `-headroom_db` LUFS, optionally followed
/// by a `tanh` soft compressor to keep peaks inside [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessStrategy {
    pub headroom_db: f64,
    pub compressor: bool,
}

impl Default for LoudnessStrategy {
    fn default() -> Self {
        Self {
            headroom_db: 16.0,
            compressor: true,
        }
    }
}

impl LoudnessStrategy {
    pub fn apply(&self, samples: &mut [f32], sample_rate: u32, channels: u16) {
        if samples.is_empty() || sample_rate == 0 {
            return;
        }

        let energy = (samples.iter().map(|&s| (s as f64).powi(2)).sum::<f64>()
            / samples.len() as f64)
            .sqrt();
        if energy < MIN_ENERGY {
            return;
        }

        let loudness = integrated_loudness(samples, sample_rate, channels);
        if !loudness.is_finite() {
            return;
        }

        let gain = 10f64.powf((-self.headroom_db - loudness) / 20.0) as f32;
        for s in samples.iter_mut() {
            *s *= gain;
            if self.compressor {
                *s = s.tanh();
            }
        }
    }
}

/// Second-order IIR section, direct form I
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
}

impl Biquad {
    /// K-weighting stage 1: +4 dB high shelf around 1.5 kHz
    fn high_shelf(sample_rate: f64) -> Self {
        let (gain_db, q, fc) = (4.0, 1.0 / 2f64.sqrt(), 1500.0);
        let a = 10f64.powf(gain_db / 40.0);
        let w0 = 2.0 * PI * fc / sample_rate;
        let alpha = w0.sin() / (2.0 * q);
        let cos = w0.cos();
        let sqrt_a = a.sqrt();

        let b0 = a * ((a + 1.0) + (a - 1.0) * cos + 2.0 * sqrt_a * alpha);
        let b1 = -2.0 * a * ((a - 1.0) + (a + 1.0) * cos);
        let b2 = a * ((a + 1.0) + (a - 1.0) * cos - 2.0 * sqrt_a * alpha);
        let a0 = (a + 1.0) - (a - 1.0) * cos + 2.0 * sqrt_a * alpha;
        let a1 = 2.0 * ((a - 1.0) - (a + 1.0) * cos);
        let a2 = (a + 1.0) - (a - 1.0) * cos - 2.0 * sqrt_a * alpha;

        Self::normalized([b0, b1, b2], [a0, a1, a2])
    }

    /// K-weighting stage 2: high pass at 38 Hz
    fn high_pass(sample_rate: f64) -> Self {
        let (q, fc) = (0.5, 38.0);
        let w0 = 2.0 * PI * fc / sample_rate;
        let alpha = w0.sin() / (2.0 * q);
        let cos = w0.cos();

        let b0 = (1.0 + cos) / 2.0;
        let b1 = -(1.0 + cos);
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos;
        let a2 = 1.0 - alpha;

        Self::normalized([b0, b1, b0], [a0, a1, a2])
    }

    fn normalized(b: [f64; 3], a: [f64; 3]) -> Self {
        Self {
            b: [b[0] / a[0], b[1] / a[0], b[2] / a[0]],
            a: [a[1] / a[0], a[2] / a[0]],
        }
    }

    fn filter(&self, input: &[f64]) -> Vec<f64> {
        let (mut x1, mut x2, mut y1, mut y2) = (0.0, 0.0, 0.0, 0.0);
        input
            .iter()
            .map(|&x| {
                let y = self.b[0] * x + self.b[1] * x1 + self.b[2] * x2 - self.a[0] * y1 - self.a[1] * y2;
                x2 = x1;
                x1 = x;
                y2 = y1;
                y1 = y;
                y
            })
            .collect()
    }
}

/// Gated integrated loudness in LUFS; `-inf` when every block is gated out.
pub fn integrated_loudness(samples: &[f32], sample_rate: u32, channels: u16) -> f64 {
    let channels = channels.max(1) as usize;
    let frames = samples.len() / channels;
    if frames == 0 || sample_rate == 0 {
        return f64::NEG_INFINITY;
    }

    let rate = sample_rate as f64;
    let shelf = Biquad::high_shelf(rate);
    let high_pass = Biquad::high_pass(rate);

    let weighted: Vec<Vec<f64>> = (0..channels)
        .map(|c| {
            let channel: Vec<f64> = samples.iter().skip(c).step_by(channels).map(|&s| s as f64).collect();
            high_pass.filter(&shelf.filter(&channel))
        })
        .collect();

    let block_len = ((BLOCK_SECS * rate).round() as usize).clamp(1, frames);
    let step = ((block_len as f64 * (1.0 - BLOCK_OVERLAP)).round() as usize).max(1);
    let num_blocks = (frames - block_len) / step + 1;

    // Mean square per block, summed over channels (all channel weights are 1).
    let block_power: Vec<f64> = (0..num_blocks)
        .map(|j| {
            let start = j * step;
            weighted
                .iter()
                .map(|ch| ch[start..start + block_len].iter().map(|v| v * v).sum::<f64>() / block_len as f64)
                .sum()
        })
        .collect();

    let to_lufs = |power: f64| -0.691 + 10.0 * power.log10();

    let above_absolute: Vec<f64> = block_power
        .iter()
        .copied()
        .filter(|&p| to_lufs(p) > ABSOLUTE_GATE_LUFS)
        .collect();
    if above_absolute.is_empty() {
        return f64::NEG_INFINITY;
    }

    let relative_gate =
        to_lufs(above_absolute.iter().sum::<f64>() / above_absolute.len() as f64) + RELATIVE_GATE_LU;
    let gated: Vec<f64> = above_absolute
        .into_iter()
        .filter(|&p| to_lufs(p) > relative_gate)
        .collect();
    if gated.is_empty() {
        return f64::NEG_INFINITY;
    }

    to_lufs(gated.iter().sum::<f64>() / gated.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amplitude: f32, sample_rate: u32, secs: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * secs) as usize;
        (0..n)
            .map(|i| amplitude * (i as f32 * freq * std::f32::consts::TAU / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_full_scale_1k_sine_reads_near_minus_3() {
        // A 0 dBFS 997 Hz sine on one channel reads about -3.01 LUFS.
        let samples = sine(997.0, 1.0, 48000, 3.0);
        let lufs = integrated_loudness(&samples, 48000, 1);
        assert!((lufs - -3.01).abs() < 0.2, "got {lufs}");
    }

    #[test]
    fn test_silence_is_gated() {
        let samples = vec![0.0f32; 48000];
        assert_eq!(integrated_loudness(&samples, 48000, 2), f64::NEG_INFINITY);
    }

    #[test]
    fn test_quiet_audio_left_untouched() {
        let mut samples = sine(440.0, 0.001, 32000, 1.0);
        let before = samples.clone();
        LoudnessStrategy::default().apply(&mut samples, 32000, 1);
        assert_eq!(samples, before);
    }

    #[test]
    fn test_normalizes_towards_headroom_target() {
        let mut samples = sine(997.0, 0.9, 32000, 2.0);
        let strategy = LoudnessStrategy { headroom_db: 16.0, compressor: false };
        strategy.apply(&mut samples, 32000, 1);
        let lufs = integrated_loudness(&samples, 32000, 1);
        assert!((lufs - -16.0).abs() < 0.5, "got {lufs}");
    }

    #[test]
    fn test_compressor_bounds_peaks() {
        let mut samples = sine(200.0, 0.05, 32000, 1.0);
        let strategy = LoudnessStrategy { headroom_db: -20.0, compressor: true };
        strategy.apply(&mut samples, 32000, 1);
        assert!(samples.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_short_clip_uses_single_block() {
        let samples = sine(997.0, 0.5, 16000, 0.1);
        assert!(integrated_loudness(&samples, 16000, 1).is_finite());
    }
}
