//! The ContentRanker re-scores backend candidates for one user.
//!
//! Rules are chained with the builder pattern; bonuses are computed in
//! parallel, then capped, scaled by confidence and sorted.

use crate::config::RankingConfig;
use crate::rules::{CategoryMatchRule, KeywordMatchRule};
use crate::traits::BonusRule;
use interests::{CandidateSuggestion, RankedSuggestion, UserInterests};
use rayon::prelude::*;
use tracing::debug;

/// Re-ranks candidate suggestions against a user's interests.
///
/// ## Usage
/// ```ignore
/// let ranker = ContentRanker::new()
///     .add_rule(KeywordMatchRule::new(0.10, 0.15))
///     .add_rule(CategoryMatchRule::new(0.20))
///     .with_bonus_cap(0.30);
///
/// let ranked = ranker.rank(candidates, &interests);
/// ```
pub struct ContentRanker {
    rules: Vec<Box<dyn BonusRule>>,
    bonus_cap: f64,
}

impl ContentRanker {
    /// Create a ranker with no rules. It passes base scores through.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            bonus_cap: RankingConfig::default().bonus_cap,
        }
    }

    /// The keyword + category ranker configured from `config`.
    pub fn from_config(config: &RankingConfig) -> Self {
        Self::new()
            .add_rule(KeywordMatchRule::new(
                config.recipe_keyword_bonus,
                config.faq_keyword_bonus,
            ))
            .add_rule(CategoryMatchRule::new(config.category_bonus))
            .with_bonus_cap(config.bonus_cap)
    }

    /// Add a rule to the ranker (builder pattern).
    pub fn add_rule(mut self, rule: impl BonusRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn with_bonus_cap(mut self, cap: f64) -> Self {
        self.bonus_cap = cap.max(0.0);
        self
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Bonus actually applied to `candidate`:
    /// `min(sum of rule bonuses, cap) * confidence`.
    pub fn applied_bonus(&self, candidate: &CandidateSuggestion, interests: &UserInterests) -> f64 {
        let confidence = interests.personalization_confidence.clamp(0.0, 1.0);
        if confidence == 0.0 {
            return 0.0;
        }
        let raw: f64 = self
            .rules
            .iter()
            .map(|rule| rule.bonus(candidate, interests).max(0.0))
            .sum();
        raw.min(self.bonus_cap) * confidence
    }

    /// Rank candidates by final score, highest first.
    ///
    /// ## Algorithm
    /// 1. For each candidate (in parallel, order preserved):
    ///    `final = min(base + applied_bonus, 1.0)`
    /// 2. Stable sort by final score descending, so ties keep the
    ///    backend's original order
    pub fn rank(
        &self,
        candidates: Vec<CandidateSuggestion>,
        interests: &UserInterests,
    ) -> Vec<RankedSuggestion> {
        let mut ranked: Vec<RankedSuggestion> = candidates
            .into_par_iter()
            .map(|candidate| {
                let applied_bonus = self.applied_bonus(&candidate, interests);
                let final_score = (candidate.base_relevance_score + applied_bonus).min(1.0);
                RankedSuggestion {
                    suggestion: candidate,
                    final_score,
                    applied_bonus,
                }
            })
            .collect();

        // `sort_by` is stable
        ranked.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));

        debug!(
            candidates = ranked.len(),
            confidence = interests.personalization_confidence,
            boosted = ranked.iter().filter(|r| r.applied_bonus > 0.0).count(),
            "Ranked candidates"
        );
        ranked
    }
}

impl Default for ContentRanker {
    fn default() -> Self {
        Self::from_config(&RankingConfig::default())
    }
}
