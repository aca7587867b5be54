use thiserror::Error;

/// Failures of the REST collaborator, split the way callers react to them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Application error {code}: {message}")]
    Application { code: i64, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Login required")]
    AuthRequired,
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}
