//! Core traits for personalization re-ranking.
//!
//! A `BonusRule` scores one aspect of how well a candidate matches a
//! user's interests. The `ContentRanker` sums the rules, caps the sum and
//! scales it by the user's confidence.

use interests::{CandidateSuggestion, UserInterests};

/// One contribution to a candidate's personalization bonus.
///
/// ## Design Note
/// - `Send + Sync` so the ranker can evaluate candidates on the rayon pool
/// - Rules return a raw, uncapped, unscaled bonus; capping and confidence
///   scaling belong to the ranker so every rule is treated the same way
pub trait BonusRule: Send + Sync {
    /// Returns the name of this rule (for logging/debugging)
    fn name(&self) -> &str;

    /// Raw bonus for `candidate` given `interests`. Must be >= 0.
    fn bonus(&self, candidate: &CandidateSuggestion, interests: &UserInterests) -> f64;
}
