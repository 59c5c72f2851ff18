//! Tunable constants for confidence and interest updates.

use serde::Deserialize;

/// Parameters shared by `ConfidenceModel` and `InterestUpdateEngine`.
///
/// Defaults reproduce the reference behaviour. Interaction count and
/// satisfaction carry equal weight in confidence; engagement is secondary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Scored interactions required before personalization applies
    pub significance_threshold: u32,
    /// Interaction count at which the interaction weight saturates
    pub interaction_reference: f64,
    pub interaction_weight: f64,
    pub satisfaction_weight: f64,
    pub engagement_weight: f64,

    /// Moving-average step for a term's second event
    pub step_initial: f64,
    /// How fast the step shrinks with each further event
    pub step_decay: f64,
    /// Lower bound on the step, so old preferences can still move
    pub step_floor: f64,

    /// Terms scoring below this never become preferred
    pub min_preferred_relevance: f64,

    /// Keywords kept in the score/count maps
    pub max_tracked_keywords: usize,
    /// Categories kept in the score/count maps
    pub max_tracked_categories: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            significance_threshold: 5,
            interaction_reference: 20.0,
            interaction_weight: 0.4,
            satisfaction_weight: 0.4,
            engagement_weight: 0.2,
            step_initial: 0.5,
            step_decay: 0.1,
            step_floor: 0.05,
            min_preferred_relevance: 0.5,
            max_tracked_keywords: 200,
            max_tracked_categories: 50,
        }
    }
}

impl LearningConfig {
    pub fn with_significance_threshold(mut self, threshold: u32) -> Self {
        self.significance_threshold = threshold;
        self
    }

    pub fn with_interaction_reference(mut self, reference: f64) -> Self {
        self.interaction_reference = reference;
        self
    }

    /// Set the three confidence weights (interaction, satisfaction, engagement)
    pub fn with_confidence_weights(mut self, interaction: f64, satisfaction: f64, engagement: f64) -> Self {
        self.interaction_weight = interaction;
        self.satisfaction_weight = satisfaction;
        self.engagement_weight = engagement;
        self
    }

    pub fn with_step(mut self, initial: f64, decay: f64, floor: f64) -> Self {
        self.step_initial = initial;
        self.step_decay = decay;
        self.step_floor = floor;
        self
    }

    pub fn with_min_preferred_relevance(mut self, min: f64) -> Self {
        self.min_preferred_relevance = min;
        self
    }

    pub fn with_max_tracked_terms(mut self, keywords: usize, categories: usize) -> Self {
        self.max_tracked_keywords = keywords;
        self.max_tracked_categories = categories;
        self
    }

    /// Step weight for a term that now has `count` interactions.
    ///
    /// `count` includes the event being applied, so a term's second event
    /// uses `step_initial`.
    pub fn step_for(&self, count: u32) -> f64 {
        let n = count.max(1) as f64;
        let step = self.step_initial / (1.0 + self.step_decay * (n - 1.0));
        step.max(self.step_floor).clamp(0.0, 1.0)
    }
}
