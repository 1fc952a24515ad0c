//! Error types for the sticker pipeline

use thiserror::Error;

/// The main error type for sticker pipeline operations
#[derive(Debug, Error)]
pub enum StickerError {
    /// Bad or missing provider, model or key. Never retried.
    #[error("Config error: {0}")]
    Config(String),

    /// Connection failure or timeout talking to a provider.
    #[error("Network error: {0}")]
    Network(String),

    /// A provider answered with a non-2xx status or reported a failed task.
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unexpected output: {0}")]
    UnexpectedOutput(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// A prediction has not reached a terminal state yet.
    #[error("Prediction pending: {0}")]
    PredictionPending(String),

    #[error("Prediction timed out after {0} poll attempts")]
    PredictionTimedOut(u32),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),
}

impl StickerError {
    /// Shorthand for a missing record lookup
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StickerError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether another attempt of the same call could succeed.
    ///
    /// Shape and configuration failures are deterministic for a given
    /// response, so only transport-level failures qualify.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StickerError::Network(_) | StickerError::Provider(_) | StickerError::PredictionPending(_)
        )
    }
}

/// Result type alias for sticker pipeline operations
pub type Result<T> = std::result::Result<T, StickerError>;

impl From<toml::de::Error> for StickerError {
    fn from(err: toml::de::Error) -> Self {
        StickerError::TomlParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for StickerError {
    fn from(err: toml::ser::Error) -> Self {
        StickerError::TomlSerError(err.to_string())
    }
}
