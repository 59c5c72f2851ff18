//! Rule rewarding overlap with the user's preferred keywords.

use crate::traits::BonusRule;
use interests::{CandidateSuggestion, ContentType, UserInterests};

/// Adds a fixed bonus per candidate keyword found in
/// `interests.preferred_keywords`.
///
/// ## Algorithm
/// 1. Pick the per-match bonus for the candidate's content type
/// 2. Count candidate keywords that are preferred (each keyword once)
/// 3. Return count * per-match bonus
pub struct KeywordMatchRule {
    recipe_bonus: f64,
    faq_bonus: f64,
}

impl KeywordMatchRule {
    /// Create a new KeywordMatchRule.
    ///
    /// # Arguments
    /// * `recipe_bonus` - Bonus per matching keyword on recipe content (typically 0.10)
    /// * `faq_bonus` - Bonus per matching keyword on FAQ content (typically 0.15)
    pub fn new(recipe_bonus: f64, faq_bonus: f64) -> Self {
        Self {
            recipe_bonus,
            faq_bonus,
        }
    }

    fn per_match(&self, content_type: ContentType) -> f64 {
        match content_type {
            ContentType::Recipe => self.recipe_bonus,
            ContentType::Faq => self.faq_bonus,
        }
    }
}

impl Default for KeywordMatchRule {
    fn default() -> Self {
        Self::new(0.10, 0.15)
    }
}

impl BonusRule for KeywordMatchRule {
    fn name(&self) -> &str {
        "KeywordMatchRule"
    }

    fn bonus(&self, candidate: &CandidateSuggestion, interests: &UserInterests) -> f64 {
        let matches = candidate
            .keywords
            .iter()
            .enumerate()
            // Count repeated keywords once
            .filter(|(i, keyword)| !candidate.keywords[..*i].contains(*keyword))
            .filter(|(_, keyword)| interests.prefers_keyword(keyword))
            .count();
        matches as f64 * self.per_match(candidate.content_type)
    }
}
