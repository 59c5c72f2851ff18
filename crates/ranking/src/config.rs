//! Tunable bonus values for re-ranking.

use serde::Deserialize;

/// Bonus values used by the standard ranker.
///
/// A category match outweighs a single keyword match; FAQ keyword matches
/// weigh more than recipe ones because FAQ relevance is more literal.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub recipe_keyword_bonus: f64,
    pub faq_keyword_bonus: f64,
    pub category_bonus: f64,
    /// Upper bound on the summed bonus before confidence scaling
    pub bonus_cap: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            recipe_keyword_bonus: 0.10,
            faq_keyword_bonus: 0.15,
            category_bonus: 0.20,
            bonus_cap: 0.30,
        }
    }
}

impl RankingConfig {
    pub fn with_keyword_bonus(mut self, recipe: f64, faq: f64) -> Self {
        self.recipe_keyword_bonus = recipe;
        self.faq_keyword_bonus = faq;
        self
    }

    pub fn with_category_bonus(mut self, bonus: f64) -> Self {
        self.category_bonus = bonus;
        self
    }

    pub fn with_bonus_cap(mut self, cap: f64) -> Self {
        self.bonus_cap = cap;
        self
    }
}
