mod error;
pub mod job;
pub mod params;
pub mod request;
pub mod url;

pub use error::ValidationError;
pub use job::{HandlerResponse, JobEnvelope, JobResult, JobStatus};
pub use params::{GenerationParameters, MusicGenModel};
pub use request::{validate_input, GenerationRequest};
pub use self::url::is_valid_url;
