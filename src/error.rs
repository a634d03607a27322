use thiserror::Error;

use crate::marshal::MarshalError;

pub type Result<T> = std::result::Result<T, ChargifyError>;

// Every failure surfaced by the client. Nothing is retried or recovered locally.
#[derive(Error, Debug)]
pub enum ChargifyError {
    #[error("Authentication failed (401)")]
    AuthenticationFailed,

    #[error("Endpoint not enabled for API use (403)")]
    EndpointForbidden,

    #[error("Resource not found (404)")]
    ResourceNotFound,

    #[error("Validation failed (422): {}", errors.join("; "))]
    ValidationFailed { errors: Vec<String> },

    #[error("Server error ({status})")]
    ServerError { status: u16 },

    #[error("Unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Domain error: {0}")]
    Domain(String),

    #[error("Decode error: {0}")]
    Decode(#[from] MarshalError),

    #[error("Invalid postback payload: {0}")]
    InvalidPostBack(String),
}

impl From<reqwest::Error> for ChargifyError {
    fn from(err: reqwest::Error) -> Self {
        ChargifyError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ChargifyError {
    fn from(err: serde_json::Error) -> Self {
        ChargifyError::InvalidPostBack(err.to_string())
    }
}
