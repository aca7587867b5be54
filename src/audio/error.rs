use thiserror::Error;

use crate::http::ApiError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    #[error("Audio output device error: {0}")]
    DeviceError(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("No source attached")]
    NotReady,
}

/// Failures surfaced to the presentation layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Network error: {0}")]
    NetworkFailure(String),

    #[error("Request rejected ({code}): {message}")]
    ApplicationError { code: i64, message: String },

    #[error("Please log in first")]
    AuthRequired,

    #[error("No track is active")]
    NoActiveTrack,

    #[error("Nothing in the queue can be played")]
    NothingPlayable,

    #[error("Audio output error: {0}")]
    Sink(#[from] AudioError),
}

impl From<ApiError> for EngineError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Network(msg) => EngineError::NetworkFailure(msg),
            ApiError::Decode(msg) => EngineError::NetworkFailure(format!("bad response: {msg}")),
            ApiError::Application { code, message } => {
                EngineError::ApplicationError { code, message }
            }
            ApiError::AuthRequired => EngineError::AuthRequired,
        }
    }
}
