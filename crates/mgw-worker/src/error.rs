use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    InvalidValue {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}
