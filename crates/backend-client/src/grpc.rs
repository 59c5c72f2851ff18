//! gRPC client for the generative backend.

use crate::error::BackendError;
use crate::proto::{self, GENERATE_SUGGESTIONS_PATH};
use crate::types::GenerationRequest;
use crate::GenerativeBackend;
use async_trait::async_trait;
use interests::{validate_candidate, CandidateSuggestion, ContentType};
use std::time::Duration;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::Code;
use tracing::{debug, error, info, warn};

/// Client for the suggestion generation service.
///
/// Wraps a tonic channel; clones share the underlying connection.
#[derive(Clone)]
pub struct GrpcBackendClient {
    grpc: Grpc<Channel>,
    service_addr: String,
}

impl GrpcBackendClient {
    /// Connect to the generation service.
    ///
    /// # Arguments
    /// * `addr` - Address of the gRPC service (e.g., "http://localhost:50061")
    pub async fn connect(addr: impl Into<String>) -> Result<Self, BackendError> {
        let addr = addr.into();
        info!("Connecting to generative backend at {}", addr);

        let channel = Self::endpoint(&addr)?
            .connect()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        Ok(Self {
            grpc: Grpc::new(channel),
            service_addr: addr,
        })
    }

    /// Build a client that connects on first use.
    ///
    /// Useful at process start, when the backend may not be up yet.
    pub fn connect_lazy(addr: impl Into<String>) -> Result<Self, BackendError> {
        let addr = addr.into();
        let channel = Self::endpoint(&addr)?.connect_lazy();
        Ok(Self {
            grpc: Grpc::new(channel),
            service_addr: addr,
        })
    }

    fn endpoint(addr: &str) -> Result<Endpoint, BackendError> {
        Ok(Endpoint::from_shared(addr.to_string())
            .map_err(|e| BackendError::Connection(e.to_string()))?
            .connect_timeout(Duration::from_secs(3)))
    }

    /// Get the address of the backend this client talks to.
    pub fn service_address(&self) -> &str {
        &self.service_addr
    }
}

#[async_trait]
impl GenerativeBackend for GrpcBackendClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<CandidateSuggestion>, BackendError> {
        debug!(
            user_id = %request.user_id,
            content_type = %request.context.content_type,
            rich = request.directive.is_rich(),
            "Requesting suggestions"
        );

        let mut grpc = self.grpc.clone();
        grpc.ready()
            .await
            .map_err(|e| BackendError::Unavailable(format!("service not ready: {e}")))?;

        let codec: ProstCodec<proto::GenerateSuggestionsRequest, proto::GenerateSuggestionsResponse> =
            ProstCodec::default();
        let path = PathAndQuery::from_static(GENERATE_SUGGESTIONS_PATH);
        let response = grpc
            .unary(tonic::Request::new(request.into()), path, codec)
            .await
            .map_err(|status| {
                error!("gRPC error while generating suggestions: {}", status);
                status_to_error(&status)
            })?;

        Ok(candidates_from_response(
            response.into_inner(),
            request.context.content_type,
        ))
    }
}

fn status_to_error(status: &tonic::Status) -> BackendError {
    match status.code() {
        Code::DeadlineExceeded => BackendError::Timeout,
        Code::Unavailable => BackendError::Unavailable(status.message().to_string()),
        _ => BackendError::Generation(status.message().to_string()),
    }
}

/// Convert a wire response into validated candidates.
///
/// Suggestions failing validation are dropped with a warning rather than
/// failing the whole response. An unspecified content type falls back to
/// the one requested.
pub fn candidates_from_response(
    response: proto::GenerateSuggestionsResponse,
    requested: ContentType,
) -> Vec<CandidateSuggestion> {
    let total = response.suggestions.len();
    let candidates: Vec<CandidateSuggestion> = response
        .suggestions
        .into_iter()
        .filter_map(|suggestion| {
            let payload = parse_payload(&suggestion.payload_json);
            let candidate = CandidateSuggestion {
                id: suggestion.id,
                content_type: proto::content_type_from_wire(suggestion.content_type)
                    .unwrap_or(requested),
                base_relevance_score: suggestion.base_relevance_score,
                keywords: suggestion.keywords,
                category: suggestion.category,
                payload,
            };
            match validate_candidate(candidate) {
                Ok(candidate) => Some(candidate),
                Err(e) => {
                    warn!("Dropping invalid suggestion from backend: {}", e);
                    None
                }
            }
        })
        .collect();

    if candidates.len() != total {
        warn!(
            "Backend returned {} suggestions, {} passed validation",
            total,
            candidates.len()
        );
    }
    candidates
}

fn parse_payload(raw: &str) -> serde_json::Value {
    if raw.trim().is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}
