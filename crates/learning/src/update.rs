//! Interest Update Engine - fold one feedback event into a record
//!
//! ## Algorithm
//! 1. Classify the action: upvote/expand positive, downvote negative,
//!    view an impression (counts only, no score movement)
//! 2. For each keyword, bump its interaction count and move its relevance
//!    toward the signal with a decaying step; unseen terms start at the
//!    raw signal
//! 3. Same for the category
//! 4. Re-derive preferred keywords/categories as top-N by (score, count),
//!    skipping terms the user has mostly rejected
//! 5. Update totals and satisfaction
//! 6. Push search term / vendor onto their sliding windows
//! 7. Recompute confidence and stamp `updated_at`
//!
//! The engine never mutates its input. Callers keep reading the old record
//! while the new one is written.

use crate::config::LearningConfig;
use crate::confidence::ConfidenceModel;
use chrono::{DateTime, Utc};
use interests::{
    FeedbackAction, FeedbackEvent, MAX_FAVORITE_VENDORS, MAX_PREFERRED_CATEGORIES,
    MAX_PREFERRED_KEYWORDS, MAX_RECENT_SEARCH_TERMS, Polarity, UserInterests,
};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Applies feedback events to interest records
#[derive(Debug, Clone, Default)]
pub struct InterestUpdateEngine {
    config: LearningConfig,
    confidence: ConfidenceModel,
}

impl InterestUpdateEngine {
    pub fn new(config: LearningConfig) -> Self {
        Self {
            confidence: ConfidenceModel::new(config.clone()),
            config,
        }
    }

    pub fn confidence_model(&self) -> &ConfidenceModel {
        &self.confidence
    }

    /// Fold `event` into `interests`, returning the new record.
    #[instrument(skip_all, fields(user_id = %event.user_id, action = %event.action))]
    pub fn apply(
        &self,
        interests: &UserInterests,
        event: &FeedbackEvent,
        now: DateTime<Utc>,
    ) -> UserInterests {
        let mut next = interests.clone();
        let polarity = event.action.polarity();

        for keyword in &event.keywords {
            self.update_term(
                &mut next.keyword_relevance_scores,
                &mut next.keyword_interaction_counts,
                keyword,
                polarity,
            );
        }
        if let Some(category) = &event.category {
            self.update_term(
                &mut next.category_relevance_scores,
                &mut next.category_interaction_counts,
                category,
                polarity,
            );
        }

        prune_tracked(
            &mut next.keyword_relevance_scores,
            &mut next.keyword_interaction_counts,
            self.config.max_tracked_keywords,
            &event.keywords,
        );
        prune_tracked(
            &mut next.category_relevance_scores,
            &mut next.category_interaction_counts,
            self.config.max_tracked_categories,
            event.category.as_slice(),
        );

        next.preferred_keywords = top_terms(
            &next.keyword_relevance_scores,
            &next.keyword_interaction_counts,
            MAX_PREFERRED_KEYWORDS,
            self.config.min_preferred_relevance,
        );
        next.preferred_categories = top_terms(
            &next.category_relevance_scores,
            &next.category_interaction_counts,
            MAX_PREFERRED_CATEGORIES,
            self.config.min_preferred_relevance,
        );

        match event.action {
            FeedbackAction::View => next.total_views = next.total_views.saturating_add(1),
            FeedbackAction::Expand => next.total_expands = next.total_expands.saturating_add(1),
            FeedbackAction::Upvote | FeedbackAction::Downvote => {}
        }
        match polarity {
            Some(Polarity::Positive) => {
                next.total_positive_feedback = next.total_positive_feedback.saturating_add(1)
            }
            Some(Polarity::Negative) => {
                next.total_negative_feedback = next.total_negative_feedback.saturating_add(1)
            }
            None => {}
        }
        next.total_interactions = next
            .total_positive_feedback
            .saturating_add(next.total_negative_feedback);
        next.satisfaction_score = satisfaction(&next);

        if let Some(term) = &event.search_term {
            push_front_dedup(
                &mut next.recent_search_terms,
                term.clone(),
                MAX_RECENT_SEARCH_TERMS,
                |a, b| a.to_lowercase() == b.to_lowercase(),
            );
        }
        if let (Some(Polarity::Positive), Some(vendor)) = (polarity, &event.vendor_id) {
            push_front_dedup(
                &mut next.favorite_vendors,
                vendor.clone(),
                MAX_FAVORITE_VENDORS,
                |a, b| a == b,
            );
        }

        next.personalization_confidence = self.confidence.assess(&next).confidence;
        next.updated_at = Some(now);

        debug!(
            total_interactions = next.total_interactions,
            satisfaction = next.satisfaction_score,
            confidence = next.personalization_confidence,
            "Applied feedback event"
        );
        next
    }

    /// Recompute the derived confidence field of a record loaded from storage.
    pub fn refresh_confidence(&self, mut interests: UserInterests) -> UserInterests {
        interests.personalization_confidence = self.confidence.assess(&interests).confidence;
        interests
    }

    fn update_term(
        &self,
        scores: &mut HashMap<String, f64>,
        counts: &mut HashMap<String, u32>,
        term: &str,
        polarity: Option<Polarity>,
    ) {
        let count = counts.entry(term.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        let count = *count;

        let Some(polarity) = polarity else {
            return;
        };
        let signal = polarity.signal();
        let step = self.config.step_for(count);
        scores
            .entry(term.to_string())
            .and_modify(|score| *score = (*score * (1.0 - step) + signal * step).clamp(0.0, 1.0))
            .or_insert(signal);
    }
}

/// `positive / total`, 0 for an empty record
fn satisfaction(interests: &UserInterests) -> f64 {
    if interests.total_interactions == 0 {
        0.0
    } else {
        interests.total_positive_feedback as f64 / interests.total_interactions as f64
    }
}

/// Order by score, then count, both descending; names break remaining ties
/// so the order does not depend on map iteration.
fn compare_terms(
    a: (&String, f64, u32),
    b: (&String, f64, u32),
) -> Ordering {
    b.1.total_cmp(&a.1)
        .then_with(|| b.2.cmp(&a.2))
        .then_with(|| a.0.cmp(b.0))
}

fn ranked_terms<'a>(
    scores: &'a HashMap<String, f64>,
    counts: &HashMap<String, u32>,
) -> Vec<(&'a String, f64, u32)> {
    let mut terms: Vec<(&String, f64, u32)> = scores
        .iter()
        .map(|(term, &score)| (term, score, counts.get(term).copied().unwrap_or(0)))
        .collect();
    terms.sort_by(|a, b| compare_terms(*a, *b));
    terms
}

/// Top `limit` scored terms at or above `min_relevance`
fn top_terms(
    scores: &HashMap<String, f64>,
    counts: &HashMap<String, u32>,
    limit: usize,
    min_relevance: f64,
) -> Vec<String> {
    ranked_terms(scores, counts)
        .into_iter()
        .filter(|(_, score, _)| *score >= min_relevance)
        .take(limit)
        .map(|(term, _, _)| term.clone())
        .collect()
}

/// Keep at most `limit` terms in the maps.
///
/// Least relevant go first: count-only terms (seen but never voted on),
/// then lowest score, then lowest count. Terms in `protected` are only
/// evicted once nothing else is left to evict.
fn prune_tracked(
    scores: &mut HashMap<String, f64>,
    counts: &mut HashMap<String, u32>,
    limit: usize,
    protected: &[String],
) {
    if counts.len() <= limit {
        return;
    }
    let excess = counts.len() - limit;

    let mut evictable: Vec<(String, bool, Option<f64>, u32)> = counts
        .iter()
        .map(|(term, &count)| {
            (term.clone(), protected.contains(term), scores.get(term).copied(), count)
        })
        .collect();
    evictable.sort_by(|a, b| {
        let by_score = match (a.2, b.2) {
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (x, y) => x.unwrap_or(0.0).total_cmp(&y.unwrap_or(0.0)),
        };
        a.1.cmp(&b.1)
            .then(by_score)
            .then_with(|| a.3.cmp(&b.3))
            .then_with(|| b.0.cmp(&a.0))
    });

    for (term, _, _, _) in evictable.into_iter().take(excess) {
        scores.remove(&term);
        counts.remove(&term);
    }
}

fn push_front_dedup<F>(list: &mut Vec<String>, value: String, cap: usize, same: F)
where
    F: Fn(&str, &str) -> bool,
{
    list.retain(|existing| !same(existing, &value));
    list.insert(0, value);
    list.truncate(cap);
}
