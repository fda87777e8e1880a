use thiserror::Error;

/// Rejections raised before any generation work starts.
///
/// The `Display` text is returned verbatim to the caller as `{"error": ...}`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please provide input")]
    MissingInput,

    #[error("Invalid JSON format in input")]
    MalformedPayload,

    #[error("Missing '{0}' parameter")]
    MissingField(&'static str),

    #[error("'sample' must be a valid audio url")]
    InvalidSampleUrl,
}
