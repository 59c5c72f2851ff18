//! Core domain types for the personalization engine.
//!
//! This module defines the per-user interest record and the ephemeral
//! values that flow through a suggestion request:
//! - `UserInterests`: the learned, persisted preference profile
//! - `FeedbackEvent`: one validated user signal, consumed once
//! - `CandidateSuggestion` / `RankedSuggestion`: backend output before and
//!   after personalization re-ranking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// Type Aliases
// =============================================================================

/// Identifier of the user owning an interest record
pub type UserId = String;

/// Identifier of a suggestion produced by the generative backend
pub type SuggestionId = String;

// =============================================================================
// Bounds
// =============================================================================

/// Cap on `UserInterests::preferred_keywords`
pub const MAX_PREFERRED_KEYWORDS: usize = 10;

/// Cap on `UserInterests::preferred_categories`
pub const MAX_PREFERRED_CATEGORIES: usize = 5;

/// Cap on `UserInterests::recent_search_terms`
pub const MAX_RECENT_SEARCH_TERMS: usize = 20;

/// Cap on `UserInterests::favorite_vendors`
pub const MAX_FAVORITE_VENDORS: usize = 10;

/// Cap on the keywords one feedback event may carry; extras are dropped
pub const MAX_EVENT_KEYWORDS: usize = 20;

// =============================================================================
// Feedback
// =============================================================================

/// Kind of AI-generated content a suggestion or event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Recipe,
    Faq,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Recipe => "recipe",
            ContentType::Faq => "faq",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user did with a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackAction {
    View,
    Expand,
    Upvote,
    Downvote,
}

/// Polarity of a scored feedback action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    /// Target value the running averages move toward
    pub fn signal(self) -> f64 {
        match self {
            Polarity::Positive => 1.0,
            Polarity::Negative => 0.0,
        }
    }
}

impl FeedbackAction {
    /// Scored polarity of this action, `None` for impressions.
    pub fn polarity(self) -> Option<Polarity> {
        match self {
            FeedbackAction::Upvote | FeedbackAction::Expand => Some(Polarity::Positive),
            FeedbackAction::Downvote => Some(Polarity::Negative),
            FeedbackAction::View => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackAction::View => "view",
            FeedbackAction::Expand => "expand",
            FeedbackAction::Upvote => "upvote",
            FeedbackAction::Downvote => "downvote",
        }
    }
}

impl fmt::Display for FeedbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated feedback event.
///
/// Construct through `FeedbackEvent::try_from(RawFeedbackEvent)` (see the
/// `event` module) so keywords are normalised and required fields are
/// guaranteed present.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEvent {
    pub user_id: UserId,
    pub content_type: ContentType,
    /// Lowercased, trimmed, duplicate-free, in first-seen order
    pub keywords: Vec<String>,
    pub category: Option<String>,
    pub action: FeedbackAction,
    pub timestamp: DateTime<Utc>,
    pub search_term: Option<String>,
    pub vendor_id: Option<String>,
}

// =============================================================================
// Interest record
// =============================================================================

/// The learned preference profile of one user.
///
/// Mutated only by the learning crate's update engine, which returns a new
/// record per event. Field names serialize in camelCase to match the
/// persisted document layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserInterests {
    /// Most-engaged first, at most `MAX_PREFERRED_KEYWORDS`
    pub preferred_keywords: Vec<String>,
    pub keyword_relevance_scores: HashMap<String, f64>,
    pub keyword_interaction_counts: HashMap<String, u32>,

    /// Most-engaged first, at most `MAX_PREFERRED_CATEGORIES`
    pub preferred_categories: Vec<String>,
    pub category_relevance_scores: HashMap<String, f64>,
    pub category_interaction_counts: HashMap<String, u32>,

    pub satisfaction_score: f64,
    pub total_positive_feedback: u32,
    pub total_negative_feedback: u32,
    /// Scored events only; always `positive + negative`
    pub total_interactions: u32,
    pub total_views: u32,
    pub total_expands: u32,

    /// Derived from the counters, recomputed on every update and load
    pub personalization_confidence: f64,

    /// Most recent first, at most `MAX_RECENT_SEARCH_TERMS`
    pub recent_search_terms: Vec<String>,
    /// Most recent positive interaction first, at most `MAX_FAVORITE_VENDORS`
    pub favorite_vendors: Vec<String>,

    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for UserInterests {
    fn default() -> Self {
        Self {
            preferred_keywords: Vec::new(),
            keyword_relevance_scores: HashMap::new(),
            keyword_interaction_counts: HashMap::new(),
            preferred_categories: Vec::new(),
            category_relevance_scores: HashMap::new(),
            category_interaction_counts: HashMap::new(),
            satisfaction_score: 0.0,
            total_positive_feedback: 0,
            total_negative_feedback: 0,
            total_interactions: 0,
            total_views: 0,
            total_expands: 0,
            personalization_confidence: 0.0,
            recent_search_terms: Vec::new(),
            favorite_vendors: Vec::new(),
            updated_at: None,
        }
    }
}

impl UserInterests {
    /// An empty, unpersonalized record
    pub fn new() -> Self {
        Self::default()
    }

    /// Votes that were not expansions (upvotes + downvotes)
    pub fn total_votes(&self) -> u32 {
        self.total_interactions.saturating_sub(self.total_expands)
    }

    pub fn prefers_keyword(&self, keyword: &str) -> bool {
        self.preferred_keywords.iter().any(|k| k == keyword)
    }

    pub fn prefers_category(&self, category: &str) -> bool {
        self.preferred_categories.iter().any(|c| c == category)
    }

    /// Serialize into a store document
    pub fn to_document(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    /// Deserialize from a store document. Missing fields take defaults.
    pub fn from_document(document: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(document)
    }
}

// =============================================================================
// Suggestions
// =============================================================================

/// One backend-generated suggestion before re-ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSuggestion {
    pub id: SuggestionId,
    pub content_type: ContentType,
    /// Backend-assigned relevance in [0,1]
    pub base_relevance_score: f64,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Passed through to the presentation layer untouched
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl CandidateSuggestion {
    pub fn new(id: impl Into<String>, content_type: ContentType, base_relevance_score: f64) -> Self {
        Self {
            id: id.into(),
            content_type,
            base_relevance_score,
            keywords: Vec::new(),
            category: None,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// A candidate after personalization re-ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedSuggestion {
    #[serde(flatten)]
    pub suggestion: CandidateSuggestion,
    /// `min(base + applied_bonus, 1.0)`
    pub final_score: f64,
    pub applied_bonus: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_polarity() {
        assert_eq!(FeedbackAction::Upvote.polarity(), Some(Polarity::Positive));
        assert_eq!(FeedbackAction::Expand.polarity(), Some(Polarity::Positive));
        assert_eq!(FeedbackAction::Downvote.polarity(), Some(Polarity::Negative));
        assert_eq!(FeedbackAction::View.polarity(), None);
    }

    #[test]
    fn test_document_uses_camel_case() {
        let mut interests = UserInterests::new();
        interests.preferred_keywords.push("tomato".to_string());
        interests.total_interactions = 3;

        let doc = interests.to_document().unwrap();
        assert_eq!(doc["preferredKeywords"][0], "tomato");
        assert_eq!(doc["totalInteractions"], 3);
    }

    #[test]
    fn test_partial_document_takes_defaults() {
        let doc = serde_json::json!({ "totalPositiveFeedback": 2, "totalInteractions": 2 });
        let interests = UserInterests::from_document(doc).unwrap();

        assert_eq!(interests.total_positive_feedback, 2);
        assert!(interests.preferred_keywords.is_empty());
        assert!(interests.updated_at.is_none());
    }

    #[test]
    fn test_ranked_suggestion_flattens_candidate() {
        let ranked = RankedSuggestion {
            suggestion: CandidateSuggestion::new("s1", ContentType::Faq, 0.5),
            final_score: 0.6,
            applied_bonus: 0.1,
        };
        let value = serde_json::to_value(&ranked).unwrap();
        assert_eq!(value["id"], "s1");
        assert_eq!(value["contentType"], "faq");
        assert_eq!(value["finalScore"], 0.6);
    }
}
