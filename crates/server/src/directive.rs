//! Builds the personalization directive sent with each generation request.

use crate::config::EngineConfig;
use backend_client::PersonalizationDirective;
use interests::UserInterests;
use learning::ConfidenceAssessment;

/// Chooses between the rich and minimal directive tiers.
///
/// The rich tier is only used for significant users whose confidence is
/// above the configured floor; it mirrors the gate the ranker applies.
#[derive(Debug, Clone)]
pub struct DirectiveBuilder {
    min_confidence: f64,
    keywords: usize,
    categories: usize,
    search_terms: usize,
}

impl DirectiveBuilder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            min_confidence: config.rich_directive_min_confidence,
            keywords: config.directive_keywords,
            categories: config.directive_categories,
            search_terms: config.directive_search_terms,
        }
    }

    pub fn build(
        &self,
        interests: &UserInterests,
        assessment: ConfidenceAssessment,
    ) -> PersonalizationDirective {
        let recent_search_terms = take(&interests.recent_search_terms, self.search_terms);

        if !(assessment.significant && assessment.confidence > self.min_confidence) {
            return PersonalizationDirective::Minimal {
                recent_search_terms,
            };
        }

        PersonalizationDirective::Rich {
            top_keywords: take(&interests.preferred_keywords, self.keywords),
            top_categories: take(&interests.preferred_categories, self.categories),
            confidence: assessment.confidence,
            satisfaction: interests.satisfaction_score,
            recent_search_terms,
            favorite_vendors: interests.favorite_vendors.clone(),
        }
    }
}

impl Default for DirectiveBuilder {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

fn take(items: &[String], limit: usize) -> Vec<String> {
    items.iter().take(limit).cloned().collect()
}
