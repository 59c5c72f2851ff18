//! Boundary parsing for feedback events and backend candidates.
//!
//! Payloads arrive loosely typed (JSON from the app, protobuf from the
//! backend). Everything is validated here once, so the learning and
//! ranking code never sees an optional field it has to second-guess.

use crate::error::EventError;
use crate::types::{
    CandidateSuggestion, ContentType, FeedbackAction, FeedbackEvent, MAX_EVENT_KEYWORDS,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;

/// A feedback event as received from the app, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFeedbackEvent {
    pub user_id: Option<String>,
    pub content_type: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub category: Option<String>,
    pub action: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub search_term: Option<String>,
    pub vendor_id: Option<String>,
}

impl TryFrom<RawFeedbackEvent> for FeedbackEvent {
    type Error = EventError;

    fn try_from(raw: RawFeedbackEvent) -> Result<Self, Self::Error> {
        let user_id = required_text(raw.user_id, "userId")?;
        let content_type = parse_content_type(&required_text(raw.content_type, "contentType")?)?;
        let action = parse_action(&required_text(raw.action, "action")?)?;
        let timestamp = raw
            .timestamp
            .ok_or(EventError::MissingField { field: "timestamp" })?;

        normalize_event(FeedbackEvent {
            user_id,
            content_type,
            keywords: raw.keywords.unwrap_or_default(),
            category: raw.category,
            action,
            timestamp,
            search_term: raw.search_term,
            vendor_id: raw.vendor_id,
        })
    }
}

/// Bring an event into its canonical form, or reject it.
///
/// Trims the user id, normalises keywords and category (keeping at most
/// `MAX_EVENT_KEYWORDS` keywords) and drops blank search terms and vendors.
/// Events built in code go through this before they reach the learning
/// engine, just like parsed ones.
pub fn normalize_event(mut event: FeedbackEvent) -> Result<FeedbackEvent, EventError> {
    event.user_id = required_text(Some(event.user_id), "userId")?;
    event.keywords = normalize_terms(std::mem::take(&mut event.keywords));
    event.keywords.truncate(MAX_EVENT_KEYWORDS);
    event.category = normalize_term(event.category.take());
    event.search_term = trimmed(event.search_term.take());
    event.vendor_id = trimmed(event.vendor_id.take());
    Ok(event)
}

/// Parse one JSON-encoded feedback event.
pub fn parse_feedback_event(json: &str) -> Result<FeedbackEvent, EventError> {
    let raw: RawFeedbackEvent =
        serde_json::from_str(json).map_err(|e| EventError::Malformed(e.to_string()))?;
    FeedbackEvent::try_from(raw)
}

pub fn parse_content_type(s: &str) -> Result<ContentType, EventError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "recipe" => Ok(ContentType::Recipe),
        "faq" => Ok(ContentType::Faq),
        _ => Err(EventError::InvalidValue {
            field: "contentType",
            value: s.to_string(),
        }),
    }
}

pub fn parse_action(s: &str) -> Result<FeedbackAction, EventError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "view" => Ok(FeedbackAction::View),
        "expand" => Ok(FeedbackAction::Expand),
        "upvote" => Ok(FeedbackAction::Upvote),
        "downvote" => Ok(FeedbackAction::Downvote),
        _ => Err(EventError::InvalidValue {
            field: "action",
            value: s.to_string(),
        }),
    }
}

/// Trim and lowercase a single term. Blank terms become `None`.
pub fn normalize_term(term: Option<String>) -> Option<String> {
    term.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty())
}

/// Normalise a keyword list: trim, lowercase, drop blanks and duplicates,
/// keeping first-seen order.
pub fn normalize_terms<I>(terms: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    terms
        .into_iter()
        .filter_map(|t| normalize_term(Some(t)))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Validate a backend candidate.
///
/// Rejects an empty id or a non-finite score; clamps the base score into
/// [0,1] and normalises keywords and category the same way events are.
pub fn validate_candidate(
    mut candidate: CandidateSuggestion,
) -> Result<CandidateSuggestion, EventError> {
    candidate.id = candidate.id.trim().to_string();
    if candidate.id.is_empty() {
        return Err(EventError::MissingField { field: "id" });
    }
    if !candidate.base_relevance_score.is_finite() {
        return Err(EventError::InvalidValue {
            field: "baseRelevanceScore",
            value: candidate.base_relevance_score.to_string(),
        });
    }
    candidate.base_relevance_score = candidate.base_relevance_score.clamp(0.0, 1.0);
    candidate.keywords = normalize_terms(std::mem::take(&mut candidate.keywords));
    candidate.category = normalize_term(candidate.category.take());
    Ok(candidate)
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String, EventError> {
    trimmed(value).ok_or(EventError::MissingField { field })
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
