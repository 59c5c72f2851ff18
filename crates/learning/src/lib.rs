//! # Learning Crate
//!
//! Turns feedback into preference state, and preference state into a
//! confidence measure.
//!
//! ## Components
//!
//! ### InterestUpdateEngine
//! Folds one `FeedbackEvent` into a `UserInterests` record:
//! - Per-keyword and per-category running relevance (decaying-step EMA)
//! - Bounded preferred lists, search-term and vendor windows
//! - Totals, satisfaction, and a recomputed confidence
//!
//! ### ConfidenceModel
//! Decides whether a record is significant (enough scored interactions)
//! and how much to trust it, as a value in [0,1].
//!
//! Both are pure and synchronous: no I/O, no clocks (the caller passes
//! `now`), identical inputs give identical outputs.
//!
//! ## Example Usage
//!
//! ```ignore
//! use learning::{InterestUpdateEngine, LearningConfig};
//!
//! let engine = InterestUpdateEngine::new(LearningConfig::default());
//! let updated = engine.apply(&current, &event, chrono::Utc::now());
//! let assessment = engine.confidence_model().assess(&updated);
//! ```

// Public modules
pub mod confidence;
pub mod config;
pub mod update;

// Re-export commonly used types
pub use confidence::{ConfidenceAssessment, ConfidenceModel, engagement_rate};
pub use config::LearningConfig;
pub use update::InterestUpdateEngine;
