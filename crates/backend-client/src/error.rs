use thiserror::Error;

/// Errors that can occur when interacting with the generative backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Failed to connect to generative backend: {0}")]
    Connection(String),

    #[error("Generative backend unavailable: {0}")]
    Unavailable(String),

    #[error("Generative backend timed out")]
    Timeout,

    #[error("Failed to generate suggestions: {0}")]
    Generation(String),

    #[error("Invalid response from generative backend: {0}")]
    InvalidResponse(String),
}
