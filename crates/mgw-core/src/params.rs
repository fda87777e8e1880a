use serde::{Deserialize, Serialize};

pub const DEFAULT_TOP_K: u32 = 250;
pub const DEFAULT_TOP_P: f32 = 0.0;
pub const DEFAULT_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_CFG_COEF: f32 = 3.0;

/// Pretrained MusicGen checkpoints the worker knows how to ask for
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MusicGenModel {
    Small,
    Medium,
    Large,
    Melody,
    #[default]
    MelodyLarge,
    /// Any other checkpoint id the inference service can resolve
    Custom(String),
}

impl MusicGenModel {
    pub fn id(&self) -> &str {
        match self {
            Self::Small => "facebook/musicgen-small",
            Self::Medium => "facebook/musicgen-medium",
            Self::Large => "facebook/musicgen-large",
            Self::Melody => "facebook/musicgen-melody",
            Self::MelodyLarge => "facebook/musicgen-melody-large",
            Self::Custom(id) => id.as_str(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Small => "MusicGen Small",
            Self::Medium => "MusicGen Medium",
            Self::Large => "MusicGen Large",
            Self::Melody => "MusicGen Melody",
            Self::MelodyLarge => "MusicGen Melody Large",
            Self::Custom(id) => id.as_str(),
        }
    }

    /// Whether the checkpoint accepts chroma conditioning from a reference clip.
    /// Unknown checkpoints are given the benefit of the doubt.
    pub fn supports_melody(&self) -> bool {
        !matches!(self, Self::Small | Self::Medium | Self::Large)
    }

    pub fn from_id(id: &str) -> Self {
        Self::all()
            .into_iter()
            .find(|m| m.id() == id)
            .unwrap_or_else(|| Self::Custom(id.to_string()))
    }

    pub fn all() -> [MusicGenModel; 5] {
        [Self::Small, Self::Medium, Self::Large, Self::Melody, Self::MelodyLarge]
    }
}

/// Sampling parameters handed to the model for a single generation call.
///
/// These are opaque to the worker and forwarded without range checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub duration: f64,
    pub top_k: u32,
    pub top_p: f32,
    pub temperature: f32,
    pub cfg_coef: f32,
}

impl GenerationParameters {
    pub fn with_duration(duration: f64) -> Self {
        Self {
            duration,
            top_k: DEFAULT_TOP_K,
            top_p: DEFAULT_TOP_P,
            temperature: DEFAULT_TEMPERATURE,
            cfg_coef: DEFAULT_CFG_COEF,
        }
    }
}
