use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenerationError>;

/// Anything that stops a melody from being produced.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("failed to load model {model}: {reason}")]
    ModelLoad { model: String, reason: String },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("failed to download reference audio: {0}")]
    Download(String),

    #[error("failed to decode audio: {0}")]
    Decode(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("failed to encode audio: {0}")]
    Encode(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl From<hound::Error> for GenerationError {
    fn from(error: hound::Error) -> Self {
        GenerationError::Encode(error.to_string())
    }
}
