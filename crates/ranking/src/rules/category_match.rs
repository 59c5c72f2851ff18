//! Rule rewarding a candidate whose category the user prefers.

use crate::traits::BonusRule;
use interests::{CandidateSuggestion, UserInterests};

/// Adds `bonus` when the candidate's category is in
/// `interests.preferred_categories`.
pub struct CategoryMatchRule {
    bonus: f64,
}

impl CategoryMatchRule {
    /// Create a new CategoryMatchRule.
    ///
    /// # Arguments
    /// * `bonus` - Bonus for a preferred category (typically 0.20)
    pub fn new(bonus: f64) -> Self {
        Self { bonus }
    }
}

impl Default for CategoryMatchRule {
    fn default() -> Self {
        Self::new(0.20)
    }
}

impl BonusRule for CategoryMatchRule {
    fn name(&self) -> &str {
        "CategoryMatchRule"
    }

    fn bonus(&self, candidate: &CandidateSuggestion, interests: &UserInterests) -> f64 {
        match &candidate.category {
            Some(category) if interests.prefers_category(category) => self.bonus,
            _ => 0.0,
        }
    }
}
