//! Personalization re-ranking of generated suggestions.
//!
//! This crate provides:
//! - BonusRule trait and implementations (keyword and category matches)
//! - ContentRanker for composing rules and ranking candidates
//! - RankingConfig holding the bonus values
//!
//! ## Architecture
//! Each candidate goes through the same steps:
//! 1. Every rule contributes a raw bonus
//! 2. The sum is capped so personalization never dominates the base score
//! 3. The capped bonus is scaled by the user's confidence
//! 4. Candidates are sorted by final score, ties in original order
//!
//! ## Example Usage
//! ```ignore
//! use ranking::{ContentRanker, RankingConfig};
//!
//! let ranker = ContentRanker::from_config(&RankingConfig::default());
//! let ranked = ranker.rank(candidates, &interests);
//! ```

pub mod config;
pub mod ranker;
pub mod rules;
pub mod traits;

// Re-export main types
pub use config::RankingConfig;
pub use ranker::ContentRanker;
pub use traits::BonusRule;
