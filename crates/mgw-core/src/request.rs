use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::url::is_valid_url;

/// A validated generation request.
///
/// `prompt` and `duration` are only checked for presence; their types are
/// interpreted later by the generator, which is where a bad value fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: Value,
    pub duration: Value,
    pub sample: Option<String>,
}

impl GenerationRequest {
    pub fn prompt_text(&self) -> Option<&str> {
        self.prompt.as_str()
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.duration.as_f64()
    }
}

/// Normalize a job's `input` payload into a [`GenerationRequest`].
///
/// The payload may be a JSON object or a string holding an encoded object.
pub fn validate_input(input: Option<&Value>) -> Result<GenerationRequest, ValidationError> {
    let input = match input {
        None | Some(Value::Null) => return Err(ValidationError::MissingInput),
        Some(v) => v,
    };

    let decoded;
    let fields: &Map<String, Value> = match input {
        Value::String(raw) => {
            decoded = serde_json::from_str::<Value>(raw)
                .map_err(|_| ValidationError::MalformedPayload)?;
            decoded.as_object().ok_or(ValidationError::MalformedPayload)?
        }
        Value::Object(map) => map,
        _ => return Err(ValidationError::MalformedPayload),
    };

    let prompt = present(fields, "prompt").ok_or(ValidationError::MissingField("prompt"))?;
    let duration = present(fields, "duration").ok_or(ValidationError::MissingField("duration"))?;

    let sample = match present(fields, "sample") {
        None => None,
        Some(Value::String(url)) if is_valid_url(url) => Some(url.clone()),
        Some(_) => return Err(ValidationError::InvalidSampleUrl),
    };

    Ok(GenerationRequest {
        prompt: prompt.clone(),
        duration: duration.clone(),
        sample,
    })
}

fn present<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields.get(key).filter(|v| !v.is_null())
}
