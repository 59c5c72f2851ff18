//! Client for the generative suggestion backend.
//!
//! The backend produces candidate recipes and FAQs for a post, optionally
//! biased by a `PersonalizationDirective`. This crate handles:
//! - The `GenerativeBackend` seam the orchestrator calls through
//! - A gRPC client for the `suggestions.v1` service
//! - Converting domain types to protobuf messages and back
//! - Validating whatever the backend returns before it reaches ranking
//! - A fixture backend for offline runs and tests

use async_trait::async_trait;
use interests::CandidateSuggestion;

pub mod error;
pub mod fixture;
pub mod grpc;
pub mod proto;
pub mod types;

pub use error::BackendError;
pub use fixture::FixtureBackend;
pub use grpc::{candidates_from_response, GrpcBackendClient};
pub use types::{GenerationRequest, PersonalizationDirective, SuggestionContext};

/// Anything that can generate candidate suggestions for a request.
///
/// Implementations return candidates already validated; an empty list is
/// a valid answer, distinct from an error.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<CandidateSuggestion>, BackendError>;
}
