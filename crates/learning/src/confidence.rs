//! Confidence Model - how far to trust a user's interest record
//!
//! ## Algorithm
//! 1. A record is *significant* once it holds `significance_threshold`
//!    scored interactions (5 by default). Below that, confidence is 0.
//! 2. Otherwise blend three terms, each in [0,1]:
//!    - interaction weight: `min(total_interactions / reference, 1)`
//!    - satisfaction score, as stored on the record
//!    - engagement rate: votes per impression (views + expands)
//! 3. Clamp the weighted sum into [0,1].
//!
//! Pure and deterministic: the same record always yields the same result.

use crate::config::LearningConfig;
use interests::UserInterests;

/// Result of assessing an interest record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceAssessment {
    pub confidence: f64,
    pub significant: bool,
}

impl ConfidenceAssessment {
    /// Assessment used when nothing is known about a user
    pub const NONE: ConfidenceAssessment = ConfidenceAssessment {
        confidence: 0.0,
        significant: false,
    };
}

#[derive(Debug, Clone, Default)]
pub struct ConfidenceModel {
    config: LearningConfig,
}

impl ConfidenceModel {
    pub fn new(config: LearningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    pub fn is_significant(&self, interests: &UserInterests) -> bool {
        interests.total_interactions >= self.config.significance_threshold
    }

    pub fn assess(&self, interests: &UserInterests) -> ConfidenceAssessment {
        if !self.is_significant(interests) {
            return ConfidenceAssessment::NONE;
        }

        let confidence = self.config.interaction_weight * self.interaction_weight(interests)
            + self.config.satisfaction_weight * interests.satisfaction_score.clamp(0.0, 1.0)
            + self.config.engagement_weight * engagement_rate(interests);

        ConfidenceAssessment {
            confidence: clamp01(confidence),
            significant: true,
        }
    }

    fn interaction_weight(&self, interests: &UserInterests) -> f64 {
        if self.config.interaction_reference <= 0.0 {
            return 1.0;
        }
        (interests.total_interactions as f64 / self.config.interaction_reference).min(1.0)
    }
}

/// Share of impressions (views and expands) that provoked a vote.
///
/// A user who votes without any recorded impressions counts as fully
/// engaged; a user with neither is not engaged at all.
pub fn engagement_rate(interests: &UserInterests) -> f64 {
    let votes = interests.total_votes() as f64;
    let impressions = interests.total_views as f64 + interests.total_expands as f64;

    if impressions == 0.0 {
        return if votes > 0.0 { 1.0 } else { 0.0 };
    }
    (votes / impressions).min(1.0)
}

fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interests_with(positive: u32, negative: u32) -> UserInterests {
        let mut interests = UserInterests::new();
        interests.total_positive_feedback = positive;
        interests.total_negative_feedback = negative;
        interests.total_interactions = positive + negative;
        if interests.total_interactions > 0 {
            interests.satisfaction_score = positive as f64 / interests.total_interactions as f64;
        }
        interests
    }

    #[test]
    fn test_below_threshold_is_zero() {
        let model = ConfidenceModel::default();
        let assessment = model.assess(&interests_with(4, 0));

        assert_eq!(assessment, ConfidenceAssessment::NONE);
    }

    #[test]
    fn test_at_threshold_is_significant() {
        let model = ConfidenceModel::default();
        let assessment = model.assess(&interests_with(5, 0));

        assert!(assessment.significant);
        // 0.4 * 5/20 + 0.4 * 1.0 + 0.2 * 1.0
        assert!((assessment.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_saturates_past_reference() {
        let model = ConfidenceModel::default();
        let assessment = model.assess(&interests_with(40, 0));

        assert!((assessment.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_dissatisfied_user_has_lower_confidence() {
        let model = ConfidenceModel::default();
        let happy = model.assess(&interests_with(10, 0));
        let unhappy = model.assess(&interests_with(2, 8));

        assert!(happy.confidence > unhappy.confidence);
        assert!(unhappy.confidence >= 0.0);
    }

    #[test]
    fn test_engagement_rate() {
        let mut interests = interests_with(3, 1);
        assert_eq!(engagement_rate(&interests), 1.0);

        interests.total_views = 8;
        assert_eq!(engagement_rate(&interests), 0.5);

        assert_eq!(engagement_rate(&UserInterests::new()), 0.0);
    }

    #[test]
    fn test_assessment_is_deterministic() {
        let model = ConfidenceModel::default();
        let mut interests = interests_with(7, 3);
        interests.total_views = 12;

        assert_eq!(model.assess(&interests), model.assess(&interests));
    }
}
