//! Error types for playback control
//!
//! Two layers:
//! - [`PlayerError`] is returned from API calls that can fail outright
//!   (invalid tracks, bad configuration, storage plumbing)
//! - [`ErrorKind`] / [`PlaybackError`] is the typed `last_error` recorded in
//!   [`crate::PlaybackState`] when an external capability fails. Those failures
//!   never escape the controller as `Err`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by fallible player operations
#[derive(Debug, Error)]
pub enum PlayerError {
    /// Track failed validation (empty id, negative or non-finite duration)
    #[error("Invalid track: {0}")]
    InvalidTrack(String),

    /// Queue index out of bounds
    #[error("Index out of bounds: {index} (queue length {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Configuration rejected by [`crate::PlayerConfig::validate`]
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Host offers no frequency analysis capability
    #[error("Unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    /// Snapshot (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key-value store rejected a read or write
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for player operations
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Category of a failure recorded in playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// No analysis capability; visualization degrades to an empty spectrum
    UnsupportedEnvironment,

    /// Source could not be fetched or decoded
    LoadFailure,

    /// Autoplay policy or permission rejected playback
    PlaybackDenied,

    /// Operation not valid in the current state
    InvalidOperation,

    /// Snapshot could not be saved or restored
    PersistenceFailure,
}

/// Typed error descriptor stored as `last_error`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind:?}: {message}")]
pub struct PlaybackError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PlaybackError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Failure reported by the external playback engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Playback rejected by autoplay policy or a missing user gesture
    #[error("Playback not allowed: {0}")]
    NotAllowed(String),

    /// Media could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Media could not be fetched
    #[error("Network error: {0}")]
    Network(String),

    /// Source format not supported by the host
    #[error("Unsupported source: {0}")]
    Unsupported(String),

    /// Anything else the host reports
    #[error("Engine error: {0}")]
    Other(String),
}

impl EngineError {
    /// Map to the state-level error category
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotAllowed(_) => ErrorKind::PlaybackDenied,
            EngineError::Decode(_)
            | EngineError::Network(_)
            | EngineError::Unsupported(_)
            | EngineError::Other(_) => ErrorKind::LoadFailure,
        }
    }
}

impl From<EngineError> for PlaybackError {
    fn from(error: EngineError) -> Self {
        PlaybackError::new(error.kind(), error.to_string())
    }
}
