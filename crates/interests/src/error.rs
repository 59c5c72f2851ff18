//! Error types for the interests crate.
//!
//! Two families live here:
//! - `StoreError` for the durable document store (recoverable by callers)
//! - `EventError` for malformed feedback events and candidates rejected at
//!   the boundary

use thiserror::Error;

/// Errors raised by an `InterestStore` implementation
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not be reached or refused the operation
    #[error("Interest store unavailable: {0}")]
    Unavailable(String),

    /// I/O error while reading or writing a document
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document could not be encoded or decoded
    #[error("Invalid interest document for user {user_id}: {source}")]
    Document {
        user_id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A feedback event or candidate that failed boundary validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventError {
    /// A required field was absent or blank
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    /// A field had a value outside its domain
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    /// The payload was not valid JSON for the expected shape
    #[error("Malformed payload: {0}")]
    Malformed(String),
}

/// Convenience alias for store results
pub type StoreResult<T> = std::result::Result<T, StoreError>;
