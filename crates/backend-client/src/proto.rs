//! Protobuf messages for the `suggestions.v1` service.
//!
//! Mirrors `proto/suggestions.proto`. The messages are derived directly
//! with `prost` so the crate builds without a protoc toolchain.

use crate::types::{GenerationRequest, PersonalizationDirective as DomainDirective};
use interests::ContentType as DomainContentType;

/// Full method path of `SuggestionGenerator.GenerateSuggestions`
pub const GENERATE_SUGGESTIONS_PATH: &str =
    "/suggestions.v1.SuggestionGenerator/GenerateSuggestions";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ContentType {
    Unspecified = 0,
    Recipe = 1,
    Faq = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DirectiveTier {
    Minimal = 0,
    Rich = 1,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PersonalizationDirective {
    #[prost(enumeration = "DirectiveTier", tag = "1")]
    pub tier: i32,
    #[prost(string, repeated, tag = "2")]
    pub top_keywords: Vec<String>,
    #[prost(string, repeated, tag = "3")]
    pub top_categories: Vec<String>,
    #[prost(double, tag = "4")]
    pub confidence: f64,
    #[prost(double, tag = "5")]
    pub satisfaction: f64,
    #[prost(string, repeated, tag = "6")]
    pub recent_search_terms: Vec<String>,
    #[prost(string, repeated, tag = "7")]
    pub favorite_vendors: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GenerateSuggestionsRequest {
    #[prost(string, tag = "1")]
    pub user_id: String,
    #[prost(enumeration = "ContentType", tag = "2")]
    pub content_type: i32,
    #[prost(string, tag = "3")]
    pub media_context: String,
    #[prost(string, optional, tag = "4")]
    pub post_id: Option<String>,
    #[prost(message, optional, tag = "5")]
    pub directive: Option<PersonalizationDirective>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Suggestion {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(enumeration = "ContentType", tag = "2")]
    pub content_type: i32,
    #[prost(double, tag = "3")]
    pub base_relevance_score: f64,
    #[prost(string, repeated, tag = "4")]
    pub keywords: Vec<String>,
    #[prost(string, optional, tag = "5")]
    pub category: Option<String>,
    #[prost(string, tag = "6")]
    pub payload_json: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GenerateSuggestionsResponse {
    #[prost(message, repeated, tag = "1")]
    pub suggestions: Vec<Suggestion>,
}

impl From<DomainContentType> for ContentType {
    fn from(value: DomainContentType) -> Self {
        match value {
            DomainContentType::Recipe => ContentType::Recipe,
            DomainContentType::Faq => ContentType::Faq,
        }
    }
}

/// Map a wire content type, `None` when unspecified or unknown.
pub fn content_type_from_wire(value: i32) -> Option<DomainContentType> {
    match ContentType::try_from(value).ok()? {
        ContentType::Recipe => Some(DomainContentType::Recipe),
        ContentType::Faq => Some(DomainContentType::Faq),
        ContentType::Unspecified => None,
    }
}

impl From<&DomainDirective> for PersonalizationDirective {
    fn from(directive: &DomainDirective) -> Self {
        match directive {
            DomainDirective::Minimal {
                recent_search_terms,
            } => PersonalizationDirective {
                tier: DirectiveTier::Minimal as i32,
                recent_search_terms: recent_search_terms.clone(),
                ..Default::default()
            },
            DomainDirective::Rich {
                top_keywords,
                top_categories,
                confidence,
                satisfaction,
                recent_search_terms,
                favorite_vendors,
            } => PersonalizationDirective {
                tier: DirectiveTier::Rich as i32,
                top_keywords: top_keywords.clone(),
                top_categories: top_categories.clone(),
                confidence: *confidence,
                satisfaction: *satisfaction,
                recent_search_terms: recent_search_terms.clone(),
                favorite_vendors: favorite_vendors.clone(),
            },
        }
    }
}

impl From<&GenerationRequest> for GenerateSuggestionsRequest {
    fn from(request: &GenerationRequest) -> Self {
        GenerateSuggestionsRequest {
            user_id: request.user_id.clone(),
            content_type: ContentType::from(request.context.content_type) as i32,
            media_context: request.context.media_context.clone(),
            post_id: request.context.post_id.clone(),
            directive: Some(PersonalizationDirective::from(&request.directive)),
        }
    }
}
