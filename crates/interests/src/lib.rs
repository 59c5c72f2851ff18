//! # Interests Crate
//!
//! Data model and persistence for per-user personalization state.
//!
//! ## Main Components
//!
//! - **types**: `UserInterests`, `FeedbackEvent`, `CandidateSuggestion`, `RankedSuggestion`
//! - **event**: validation of raw feedback events and backend candidates
//! - **store**: the `InterestStore` trait plus in-memory and JSON-file stores
//! - **error**: store and validation errors
//!
//! ## Example Usage
//!
//! ```ignore
//! use interests::{parse_feedback_event, InMemoryInterestStore, InterestStore};
//!
//! let event = parse_feedback_event(line)?;
//! let store = InMemoryInterestStore::new();
//! let current = store.get(&event.user_id).await?.unwrap_or_default();
//! ```

// Public modules
pub mod error;
pub mod event;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{EventError, StoreError, StoreResult};
pub use event::{
    RawFeedbackEvent, normalize_event, normalize_term, normalize_terms, parse_feedback_event,
    validate_candidate,
};
pub use store::{InMemoryInterestStore, InterestStore, JsonFileStore};
pub use types::{
    // Type aliases
    SuggestionId,
    UserId,
    // Core types
    CandidateSuggestion,
    FeedbackEvent,
    RankedSuggestion,
    UserInterests,
    // Enums
    ContentType,
    FeedbackAction,
    Polarity,
    // Bounds
    MAX_EVENT_KEYWORDS,
    MAX_FAVORITE_VENDORS,
    MAX_PREFERRED_CATEGORIES,
    MAX_PREFERRED_KEYWORDS,
    MAX_RECENT_SEARCH_TERMS,
};
