//! Error types for Cogsynth

use thiserror::Error;

/// Why a raw event could not be normalized into a `Stimulus`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("unknown stimulus type: {0}")]
    UnknownKind(String),

    #[error("{kind} stimulus requires field `{field}`")]
    MissingField { kind: String, field: &'static str },

    #[error("field `{field}` must have exactly 2 components, got {len}")]
    WrongArity { field: &'static str, len: usize },

    #[error("field `{field}` contains a non-finite number")]
    NonFinite { field: &'static str },

    #[error("field `{field}` is too large to quantize into a cache key")]
    OutOfRange { field: &'static str },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid stimulus: {0}")]
    Validation(#[from] ValidationError),

    #[error("config error: {0}")]
    Config(String),

    #[error("logic seed error: {0}")]
    Seed(String),

    #[error("result sink error: {0}")]
    Sink(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn seed(message: impl Into<String>) -> Self {
        Self::Seed(message.into())
    }

    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink(message.into())
    }

    /// True for per-event failures the caller may skip past.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
