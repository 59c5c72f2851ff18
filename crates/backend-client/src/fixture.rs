//! Offline backend that serves candidates from a fixture.
//!
//! Used by the CLI and by tests when no generation service is running.
//! Every candidate is validated on the way in, so the fixture obeys the
//! same rules as a live backend response.

use crate::error::BackendError;
use crate::types::GenerationRequest;
use crate::GenerativeBackend;
use async_trait::async_trait;
use interests::{validate_candidate, CandidateSuggestion};
use std::path::Path;
use tracing::{debug, info, warn};

/// Serves a fixed candidate pool, filtered by the requested content type
#[derive(Debug, Clone, Default)]
pub struct FixtureBackend {
    candidates: Vec<CandidateSuggestion>,
}

impl FixtureBackend {
    pub fn new(candidates: Vec<CandidateSuggestion>) -> Self {
        let candidates = candidates
            .into_iter()
            .filter_map(|candidate| match validate_candidate(candidate) {
                Ok(candidate) => Some(candidate),
                Err(e) => {
                    warn!("Skipping invalid fixture candidate: {}", e);
                    None
                }
            })
            .collect();
        Self { candidates }
    }

    /// Load candidates from a JSON array file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            BackendError::Unavailable(format!("reading fixture {}: {e}", path.display()))
        })?;
        let candidates: Vec<CandidateSuggestion> = serde_json::from_str(&raw)
            .map_err(|e| BackendError::InvalidResponse(format!("parsing fixture: {e}")))?;

        info!(
            "Loaded {} fixture candidates from {}",
            candidates.len(),
            path.display()
        );
        Ok(Self::new(candidates))
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[async_trait]
impl GenerativeBackend for FixtureBackend {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<CandidateSuggestion>, BackendError> {
        let matching: Vec<CandidateSuggestion> = self
            .candidates
            .iter()
            .filter(|c| c.content_type == request.context.content_type)
            .cloned()
            .collect();
        debug!(
            "Fixture served {} {} candidates",
            matching.len(),
            request.context.content_type
        );
        Ok(matching)
    }
}
