//! Request types sent to the generative backend.

use interests::{ContentType, UserId};
use serde::Serialize;

/// What the user is looking at when suggestions are requested
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionContext {
    pub content_type: ContentType,
    /// Free-text description of the post's media (caption, detected items)
    pub media_context: String,
    pub post_id: Option<String>,
}

impl SuggestionContext {
    pub fn new(content_type: ContentType, media_context: impl Into<String>) -> Self {
        Self {
            content_type,
            media_context: media_context.into(),
            post_id: None,
        }
    }

    pub fn with_post_id(mut self, post_id: impl Into<String>) -> Self {
        self.post_id = Some(post_id.into());
        self
    }
}

/// Compact preference summary used to bias generation.
///
/// `Rich` is only sent for users whose record is significant and trusted;
/// everyone else gets `Minimal`, which carries no learned preferences.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tier", rename_all = "camelCase")]
pub enum PersonalizationDirective {
    #[serde(rename_all = "camelCase")]
    Minimal { recent_search_terms: Vec<String> },
    #[serde(rename_all = "camelCase")]
    Rich {
        top_keywords: Vec<String>,
        top_categories: Vec<String>,
        confidence: f64,
        satisfaction: f64,
        recent_search_terms: Vec<String>,
        favorite_vendors: Vec<String>,
    },
}

impl PersonalizationDirective {
    /// A minimal directive with no context at all
    pub fn empty() -> Self {
        PersonalizationDirective::Minimal {
            recent_search_terms: Vec::new(),
        }
    }

    pub fn is_rich(&self) -> bool {
        matches!(self, PersonalizationDirective::Rich { .. })
    }
}

/// A full request to the generative backend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub user_id: UserId,
    pub context: SuggestionContext,
    pub directive: PersonalizationDirective,
}
