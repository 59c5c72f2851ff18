use backend_client::BackendError;
use interests::{EventError, StoreError};
use thiserror::Error;

/// Failures seen at the orchestrator boundary.
///
/// Only `MalformedEvent` is ever returned to a caller; the other two are
/// logged and turned into "no personalization" or "no suggestions".
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("generative backend unavailable: {0}")]
    BackendUnavailable(#[from] BackendError),

    #[error("interest store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("malformed feedback event: {0}")]
    MalformedEvent(#[from] EventError),
}
