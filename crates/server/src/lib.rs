//! Server crate for the suggestion personalization engine.
//!
//! This crate contains the orchestrator that callers talk to, plus the
//! per-process state it owns: the personalization cache, the directive
//! builder and the engine configuration.

pub mod cache;
pub mod clock;
pub mod config;
pub mod directive;
pub mod error;
pub mod orchestrator;

pub use cache::{CacheStats, CachedInterests, PersonalizationCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use directive::DirectiveBuilder;
pub use error::EngineError;
pub use orchestrator::{InterestsChanged, SuggestionOrchestrator};
