use thiserror::Error;

use crate::form::ValidationError;

#[derive(Error, Debug)]
pub enum SmartmarksError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} (status {status})")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl SmartmarksError {
    /// True when the backend rejected the caller's credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SmartmarksError::Api { status: 401 | 403, .. })
    }
}

pub type Result<T> = std::result::Result<T, SmartmarksError>;
