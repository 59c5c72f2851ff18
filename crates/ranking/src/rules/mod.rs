//! Bonus rule implementations for the content ranker.
//!
//! This module contains the concrete rules that can be composed into a
//! `ContentRanker`.

pub mod category_match;
pub mod keyword_match;

// Re-export for convenience
pub use category_match::CategoryMatchRule;
pub use keyword_match::KeywordMatchRule;
