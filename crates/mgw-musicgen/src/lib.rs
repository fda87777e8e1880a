pub mod audio;
pub mod cache;
pub mod download;
mod error;
pub mod generator;
pub mod model;
pub mod remote;

pub use cache::ModelCache;
pub use error::{GenerationError, Result};
pub use generator::{GeneratorConfig, MelodyGenerator};
pub use model::{MelodyModel, ModelLoader, Waveform};
pub use remote::RemoteLoader;
pub use reqwest::Url;
