//! Engine configuration.
//!
//! A single flat struct so it can be read from the environment with
//! `envy` (`PERSONALIZATION_CACHE_TTL_SECS=600`, ...). Learning and
//! ranking parameters are carried here too and handed to their crates via
//! `learning_config()` / `ranking_config()`.

use learning::LearningConfig;
use ranking::RankingConfig;
use serde::Deserialize;
use std::time::Duration;

/// Environment variable prefix for `EngineConfig::from_env`
pub const ENV_PREFIX: &str = "PERSONALIZATION_";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a cached interest record is served without a store read
    pub cache_ttl_secs: u64,
    /// Upper bound on cached users before LRU eviction
    pub cache_capacity: usize,

    /// Per-attempt timeout for the generative backend
    pub backend_timeout_ms: u64,
    /// Extra attempts after the first backend failure
    pub backend_retries: u32,

    /// Confidence a significant user needs for the rich directive
    pub rich_directive_min_confidence: f64,
    pub directive_keywords: usize,
    pub directive_categories: usize,
    pub directive_search_terms: usize,

    /// Buffered change notifications per subscriber
    pub notification_capacity: usize,

    // Learning
    pub significance_threshold: u32,
    pub interaction_reference: f64,
    pub interaction_weight: f64,
    pub satisfaction_weight: f64,
    pub engagement_weight: f64,
    pub step_initial: f64,
    pub step_decay: f64,
    pub step_floor: f64,
    pub min_preferred_relevance: f64,
    pub max_tracked_keywords: usize,
    pub max_tracked_categories: usize,

    // Ranking
    pub recipe_keyword_bonus: f64,
    pub faq_keyword_bonus: f64,
    pub category_bonus: f64,
    pub bonus_cap: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let learning = LearningConfig::default();
        let ranking = RankingConfig::default();
        Self {
            cache_ttl_secs: 2 * 60 * 60,
            cache_capacity: 100_000,
            backend_timeout_ms: 3_000,
            backend_retries: 1,
            rich_directive_min_confidence: 0.3,
            directive_keywords: 5,
            directive_categories: 3,
            directive_search_terms: 5,
            notification_capacity: 256,
            significance_threshold: learning.significance_threshold,
            interaction_reference: learning.interaction_reference,
            interaction_weight: learning.interaction_weight,
            satisfaction_weight: learning.satisfaction_weight,
            engagement_weight: learning.engagement_weight,
            step_initial: learning.step_initial,
            step_decay: learning.step_decay,
            step_floor: learning.step_floor,
            min_preferred_relevance: learning.min_preferred_relevance,
            max_tracked_keywords: learning.max_tracked_keywords,
            max_tracked_categories: learning.max_tracked_categories,
            recipe_keyword_bonus: ranking.recipe_keyword_bonus,
            faq_keyword_bonus: ranking.faq_keyword_bonus,
            category_bonus: ranking.category_bonus,
            bonus_cap: ranking.bonus_cap,
        }
    }
}

impl EngineConfig {
    /// Read overrides from `PERSONALIZATION_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed(ENV_PREFIX).from_env()
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_secs = ttl.as_secs();
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_backend_retries(mut self, retries: u32) -> Self {
        self.backend_retries = retries;
        self
    }

    /// Saturates at the largest representable span for oversized values.
    pub fn cache_ttl(&self) -> chrono::Duration {
        i64::try_from(self.cache_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    pub fn learning_config(&self) -> LearningConfig {
        LearningConfig {
            significance_threshold: self.significance_threshold,
            interaction_reference: self.interaction_reference,
            interaction_weight: self.interaction_weight,
            satisfaction_weight: self.satisfaction_weight,
            engagement_weight: self.engagement_weight,
            step_initial: self.step_initial,
            step_decay: self.step_decay,
            step_floor: self.step_floor,
            min_preferred_relevance: self.min_preferred_relevance,
            max_tracked_keywords: self.max_tracked_keywords,
            max_tracked_categories: self.max_tracked_categories,
        }
    }

    pub fn ranking_config(&self) -> RankingConfig {
        RankingConfig {
            recipe_keyword_bonus: self.recipe_keyword_bonus,
            faq_keyword_bonus: self.faq_keyword_bonus,
            category_bonus: self.category_bonus,
            bonus_cap: self.bonus_cap,
        }
    }
}
