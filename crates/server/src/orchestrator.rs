//! # Suggestion Orchestrator
//!
//! The façade callers talk to. Two entry points:
//!
//! ## Requesting suggestions
//! 1. Load interests (cache first, then store)
//! 2. Assess confidence and build a personalization directive
//! 3. Call the generative backend (one retry, per-attempt timeout)
//! 4. Rank the candidates against the interests
//! 5. Return the ranked list
//!
//! Any backend failure or caller timeout yields an empty list. Nothing is
//! written to the cache unless the request completes.
//!
//! ## Recording feedback
//! 1. Load interests the same way
//! 2. Apply the event with `InterestUpdateEngine`
//! 3. Update the cache immediately so the next request sees the change
//! 4. Write through to the store; failures are logged and dropped
//! 5. Publish an `InterestsChanged` notification
//!
//! Only a malformed event is reported back to the caller. A record rebuilt
//! after a failed store read stays in the cache only; neither that event
//! nor later ones built on it are written back over the stored history.
//!
//! ## Purging
//! `purge_user` tombstones the user in the cache before deleting the
//! stored record. Requests and feedback that loaded the user before the
//! purge are refused when they try to write, so they cannot bring the
//! record back.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use backend_client::{BackendError, GenerationRequest, GenerativeBackend, SuggestionContext};
use interests::{
    CandidateSuggestion, FeedbackEvent, InterestStore, RankedSuggestion, RawFeedbackEvent, UserId,
    UserInterests, normalize_event,
};
use learning::{ConfidenceAssessment, InterestUpdateEngine};
use ranking::ContentRanker;

use crate::cache::{CacheStats, CachedInterests, PersonalizationCache};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::directive::DirectiveBuilder;
use crate::error::EngineError;

/// Published after every applied feedback event
#[derive(Debug, Clone, PartialEq)]
pub struct InterestsChanged {
    pub user_id: UserId,
    pub confidence: f64,
    pub significant: bool,
    /// Whether the updated record reached the durable store
    pub persisted: bool,
}

/// Where a loaded record came from
enum Loaded {
    Cached(CachedInterests),
    Stored(Arc<UserInterests>),
    /// The store could not be read; treat the user as brand new
    Unreadable,
}

/// Coordinates cache, store, learning, backend and ranking
pub struct SuggestionOrchestrator {
    store: Arc<dyn InterestStore>,
    backend: Arc<dyn GenerativeBackend>,
    cache: PersonalizationCache,
    engine: InterestUpdateEngine,
    ranker: Arc<ContentRanker>,
    directives: DirectiveBuilder,
    clock: Arc<dyn Clock>,
    backend_timeout: Duration,
    backend_retries: u32,
    changes: broadcast::Sender<InterestsChanged>,
}

impl SuggestionOrchestrator {
    /// Create an orchestrator on the system clock
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn InterestStore>,
        backend: Arc<dyn GenerativeBackend>,
    ) -> Self {
        Self::with_clock(config, store, backend, Arc::new(SystemClock))
    }

    /// Create an orchestrator with an injected clock
    pub fn with_clock(
        config: EngineConfig,
        store: Arc<dyn InterestStore>,
        backend: Arc<dyn GenerativeBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (changes, _) = broadcast::channel(config.notification_capacity.max(1));
        Self {
            cache: PersonalizationCache::new(config.cache_capacity, config.cache_ttl(), clock.clone()),
            engine: InterestUpdateEngine::new(config.learning_config()),
            ranker: Arc::new(ContentRanker::from_config(&config.ranking_config())),
            directives: DirectiveBuilder::new(&config),
            backend_timeout: config.backend_timeout(),
            backend_retries: config.backend_retries,
            store,
            backend,
            clock,
            changes,
        }
    }

    /// Receive an `InterestsChanged` for every applied feedback event
    pub fn subscribe(&self) -> broadcast::Receiver<InterestsChanged> {
        self.changes.subscribe()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn assess(&self, interests: &UserInterests) -> ConfidenceAssessment {
        self.engine.confidence_model().assess(interests)
    }

    /// Current interests for a user, as the next request would see them.
    pub async fn current_interests(&self, user_id: &str) -> Arc<UserInterests> {
        let epoch = self.cache.epoch();
        match self.load(user_id).await {
            Loaded::Cached(cached) => cached.interests,
            Loaded::Stored(interests) => {
                self.cache.insert_if_absent(user_id, Arc::clone(&interests), epoch);
                interests
            }
            Loaded::Unreadable => Arc::new(UserInterests::new()),
        }
    }

    /// Main entry point: ranked suggestions for a user.
    ///
    /// Never fails. On backend failure or when `timeout` elapses the result
    /// is empty and the cache is left untouched.
    #[instrument(skip(self, context), fields(content_type = %context.content_type))]
    pub async fn request_suggestions(
        &self,
        user_id: &str,
        context: SuggestionContext,
        timeout: Duration,
    ) -> Vec<RankedSuggestion> {
        let start_time = Instant::now();

        match tokio::time::timeout(timeout, self.suggest(user_id, context)).await {
            Ok(Ok(ranked)) => {
                info!(
                    "Returned {} suggestions for user {} in {:.2?}",
                    ranked.len(),
                    user_id,
                    start_time.elapsed()
                );
                ranked
            }
            Ok(Err(e)) => {
                warn!("No suggestions for user {}: {}", user_id, e);
                Vec::new()
            }
            Err(_) => {
                warn!(
                    "Suggestion request for user {} exceeded {:?}, returning none",
                    user_id, timeout
                );
                Vec::new()
            }
        }
    }

    async fn suggest(
        &self,
        user_id: &str,
        context: SuggestionContext,
    ) -> Result<Vec<RankedSuggestion>, EngineError> {
        let epoch = self.cache.epoch();
        let loaded = self.load(user_id).await;
        let interests = match &loaded {
            Loaded::Cached(cached) => Arc::clone(&cached.interests),
            Loaded::Stored(interests) => Arc::clone(interests),
            Loaded::Unreadable => Arc::new(UserInterests::new()),
        };

        let assessment = self.assess(&interests);
        let directive = self.directives.build(&interests, assessment);
        debug!(
            confidence = assessment.confidence,
            significant = assessment.significant,
            rich = directive.is_rich(),
            "Built personalization directive"
        );

        let request = GenerationRequest {
            user_id: user_id.to_string(),
            context,
            directive,
        };
        let candidates = self.generate_with_retry(&request).await?;
        let ranked = self.rank(candidates, Arc::clone(&interests)).await;

        if let Loaded::Stored(interests) = loaded {
            self.cache.insert_if_absent(user_id, interests, epoch);
        }
        Ok(ranked)
    }

    async fn generate_with_retry(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<CandidateSuggestion>, EngineError> {
        let attempts = self.backend_retries + 1;
        let mut last_error = BackendError::Timeout;

        for attempt in 1..=attempts {
            let outcome = tokio::time::timeout(self.backend_timeout, self.backend.generate(request))
                .await
                .unwrap_or(Err(BackendError::Timeout));

            match outcome {
                Ok(candidates) => {
                    debug!(attempt, "Backend returned {} candidates", candidates.len());
                    return Ok(candidates);
                }
                Err(e) => {
                    warn!(attempt, attempts, "Generative backend attempt failed: {}", e);
                    last_error = e;
                }
            }
        }

        Err(EngineError::BackendUnavailable(last_error))
    }

    /// Rank on the blocking pool; the ranker fans out over rayon.
    async fn rank(
        &self,
        candidates: Vec<CandidateSuggestion>,
        interests: Arc<UserInterests>,
    ) -> Vec<RankedSuggestion> {
        let ranker = Arc::clone(&self.ranker);

        match tokio::task::spawn_blocking(move || ranker.rank(candidates, &interests)).await {
            Ok(ranked) => ranked,
            Err(e) => {
                warn!("Ranking task panicked: {}", e);
                Vec::new()
            }
        }
    }

    /// Apply one feedback event.
    ///
    /// Store problems are logged and absorbed; the cache is updated either
    /// way so the current session sees its own feedback. Returns the
    /// updated record.
    #[instrument(skip_all, fields(user_id = %event.user_id, action = %event.action))]
    pub async fn record_feedback(
        &self,
        event: FeedbackEvent,
    ) -> Result<Arc<UserInterests>, EngineError> {
        let event = check_event(event)?;
        let user_id = event.user_id.clone();

        let epoch = self.cache.epoch();
        let (current, store_backed) = match self.load(&user_id).await {
            Loaded::Cached(cached) if cached.store_backed => (cached.interests, true),
            // Rebuilt after a failed read: go back to the stored history as
            // soon as the store answers again.
            Loaded::Cached(cached) => match self.read_store(&user_id).await {
                Loaded::Stored(interests) => (interests, true),
                _ => (cached.interests, false),
            },
            Loaded::Stored(interests) => (interests, true),
            Loaded::Unreadable => (Arc::new(UserInterests::new()), false),
        };

        let updated = Arc::new(self.engine.apply(&current, &event, self.clock.now()));
        let cached = CachedInterests {
            interests: Arc::clone(&updated),
            store_backed,
        };
        if !self.cache.put(&user_id, cached, epoch) {
            info!("User {} was purged while feedback was in flight, dropping update", user_id);
            return Ok(updated);
        }

        let persisted = if store_backed {
            self.write_through(&user_id, &updated, epoch).await
        } else {
            warn!(
                "Interests for user {} were rebuilt without their stored history, keeping update in cache only",
                user_id
            );
            false
        };

        let assessment = self.assess(&updated);
        // No subscribers is fine.
        let _ = self.changes.send(InterestsChanged {
            user_id,
            confidence: assessment.confidence,
            significant: assessment.significant,
            persisted,
        });

        Ok(updated)
    }

    /// Write an updated record to the store. Returns whether it persisted.
    async fn write_through(&self, user_id: &str, updated: &UserInterests, epoch: u64) -> bool {
        if let Err(e) = self.store.put(user_id, updated).await {
            warn!("Dropping interest write for user {}: {}", user_id, e);
            return false;
        }

        // A purge that landed during the write has already deleted the
        // document; remove what this write put back.
        if self.cache.purged_since(user_id, epoch) {
            if let Err(e) = self.store.delete(user_id).await {
                warn!("Failed to remove record of purged user {}: {}", user_id, e);
            }
            info!("User {} was purged during a feedback write, record removed", user_id);
            return false;
        }
        true
    }

    /// Validate and apply a raw event as received from a client.
    pub async fn record_raw_feedback(
        &self,
        raw: RawFeedbackEvent,
    ) -> Result<Arc<UserInterests>, EngineError> {
        let event = FeedbackEvent::try_from(raw).map_err(|e| {
            warn!("Rejected malformed feedback event: {}", e);
            EngineError::MalformedEvent(e)
        })?;
        self.record_feedback(event).await
    }

    /// Validate now, apply on a background task.
    ///
    /// For callers whose primary action must not wait on feedback.
    pub fn spawn_feedback(
        self: &Arc<Self>,
        event: FeedbackEvent,
    ) -> Result<JoinHandle<()>, EngineError> {
        let event = check_event(event)?;
        let this = Arc::clone(self);
        Ok(tokio::spawn(async move {
            if let Err(e) = this.record_feedback(event).await {
                warn!("Background feedback failed: {}", e);
            }
        }))
    }

    /// Account deletion: tombstone the cache entry, then delete the stored
    /// record.
    pub async fn purge_user(&self, user_id: &str) -> Result<(), EngineError> {
        let evicted = self.cache.purge(user_id);
        self.store.delete(user_id).await?;
        info!(evicted, "Purged interests for user {}", user_id);
        Ok(())
    }

    async fn load(&self, user_id: &str) -> Loaded {
        if let Some(cached) = self.cache.get_fresh(user_id) {
            return Loaded::Cached(cached);
        }
        self.read_store(user_id).await
    }

    async fn read_store(&self, user_id: &str) -> Loaded {
        match self.store.get(user_id).await {
            Ok(Some(stored)) => Loaded::Stored(Arc::new(self.engine.refresh_confidence(stored))),
            Ok(None) => Loaded::Stored(Arc::new(UserInterests::new())),
            Err(e) => {
                warn!("{}", EngineError::StoreUnavailable(e));
                Loaded::Unreadable
            }
        }
    }
}

/// Normalise an event built in code the same way parsed events are.
fn check_event(event: FeedbackEvent) -> Result<FeedbackEvent, EngineError> {
    normalize_event(event).map_err(|e| {
        warn!("Rejected malformed feedback event: {}", e);
        EngineError::MalformedEvent(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use async_trait::async_trait;
    use backend_client::{FixtureBackend, PersonalizationDirective};
    use chrono::Utc;
    use interests::{
        ContentType, FeedbackAction, InMemoryInterestStore, StoreError, StoreResult,
    };
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    // ============================================================================
    // Fakes
    // ============================================================================

    /// Serves fixed candidates and remembers every request
    struct RecordingBackend {
        candidates: Vec<CandidateSuggestion>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl RecordingBackend {
        fn new(candidates: Vec<CandidateSuggestion>) -> Self {
            Self {
                candidates,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn last_directive(&self) -> PersonalizationDirective {
            self.requests.lock().last().unwrap().directive.clone()
        }
    }

    #[async_trait]
    impl GenerativeBackend for RecordingBackend {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<Vec<CandidateSuggestion>, BackendError> {
            self.requests.lock().push(request.clone());
            Ok(self.candidates.clone())
        }
    }

    #[derive(Default)]
    struct FailingBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerativeBackend for FailingBackend {
        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<Vec<CandidateSuggestion>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(BackendError::Unavailable("model overloaded".to_string()))
        }
    }

    /// Never answers within any reasonable timeout
    #[derive(Default)]
    struct SlowBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerativeBackend for SlowBackend {
        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<Vec<CandidateSuggestion>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    /// Fails the first call, then behaves
    struct FlakyBackend {
        calls: AtomicUsize,
        inner: RecordingBackend,
    }

    #[async_trait]
    impl GenerativeBackend for FlakyBackend {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<Vec<CandidateSuggestion>, BackendError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(BackendError::Timeout);
            }
            self.inner.generate(request).await
        }
    }

    /// Wraps an in-memory store; reads and writes can be switched off
    #[derive(Default)]
    struct FaultyStore {
        inner: InMemoryInterestStore,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
        reads: AtomicUsize,
    }

    impl FaultyStore {
        fn failing_reads() -> Self {
            let store = Self::default();
            store.fail_reads.store(true, Ordering::SeqCst);
            store
        }

        fn failing_writes() -> Self {
            let store = Self::default();
            store.fail_writes.store(true, Ordering::SeqCst);
            store
        }
    }

    #[async_trait]
    impl InterestStore for FaultyStore {
        async fn get(&self, user_id: &str) -> StoreResult<Option<UserInterests>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("read timeout".to_string()));
            }
            self.inner.get(user_id).await
        }

        async fn put(&self, user_id: &str, interests: &UserInterests) -> StoreResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("write rejected".to_string()));
            }
            self.inner.put(user_id, interests).await
        }

        async fn delete(&self, user_id: &str) -> StoreResult<()> {
            self.inner.delete(user_id).await
        }
    }

    // ============================================================================
    // Fixtures
    // ============================================================================

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn candidates() -> Vec<CandidateSuggestion> {
        vec![
            CandidateSuggestion::new("generic", ContentType::Recipe, 0.6).with_keywords(["rice"]),
            CandidateSuggestion::new("tomato-tart", ContentType::Recipe, 0.5)
                .with_keywords(["tomato"])
                .with_category("produce"),
        ]
    }

    fn context() -> SuggestionContext {
        SuggestionContext::new(ContentType::Recipe, "heirloom tomatoes at the market")
    }

    fn upvote(user_id: &str) -> FeedbackEvent {
        FeedbackEvent {
            user_id: user_id.to_string(),
            content_type: ContentType::Recipe,
            keywords: vec!["tomato".to_string()],
            category: Some("produce".to_string()),
            action: FeedbackAction::Upvote,
            timestamp: Utc::now(),
            search_term: None,
            vendor_id: None,
        }
    }

    fn orchestrator(
        store: Arc<dyn InterestStore>,
        backend: Arc<dyn GenerativeBackend>,
    ) -> SuggestionOrchestrator {
        SuggestionOrchestrator::with_clock(
            EngineConfig::default(),
            store,
            backend,
            Arc::new(ManualClock::default()),
        )
    }

    // ============================================================================
    // Requests
    // ============================================================================

    #[tokio::test]
    async fn test_cold_user_gets_backend_order_and_minimal_directive() {
        let backend = Arc::new(RecordingBackend::new(candidates()));
        let engine = orchestrator(Arc::new(InMemoryInterestStore::new()), backend.clone());

        let ranked = engine.request_suggestions("u1", context(), TIMEOUT).await;

        let ids: Vec<&str> = ranked.iter().map(|r| r.suggestion.id.as_str()).collect();
        assert_eq!(ids, vec!["generic", "tomato-tart"]);
        assert!(ranked.iter().all(|r| r.applied_bonus == 0.0));
        assert!(!backend.last_directive().is_rich());
    }

    #[tokio::test]
    async fn test_warm_user_gets_rich_directive_and_boost() {
        let backend = Arc::new(RecordingBackend::new(candidates()));
        let engine = orchestrator(Arc::new(InMemoryInterestStore::new()), backend.clone());

        for _ in 0..10 {
            engine.record_feedback(upvote("u1")).await.unwrap();
        }
        let ranked = engine.request_suggestions("u1", context(), TIMEOUT).await;

        assert_eq!(ranked[0].suggestion.id, "tomato-tart");
        assert!(ranked[0].applied_bonus > 0.0);
        match backend.last_directive() {
            PersonalizationDirective::Rich { top_keywords, top_categories, .. } => {
                assert_eq!(top_keywords, vec!["tomato"]);
                assert_eq!(top_categories, vec!["produce"]);
            }
            other => panic!("expected rich directive, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_backend_failure_retried_once_then_empty() {
        let store = Arc::new(InMemoryInterestStore::new());
        let backend = Arc::new(FailingBackend::default());
        let engine = orchestrator(store.clone(), backend.clone());

        let ranked = engine.request_suggestions("u1", context(), TIMEOUT).await;

        assert!(ranked.is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
        assert_eq!(engine.cache_stats().entries, 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_single_failure() {
        let backend = Arc::new(FlakyBackend {
            calls: AtomicUsize::new(0),
            inner: RecordingBackend::new(candidates()),
        });
        let engine = orchestrator(Arc::new(InMemoryInterestStore::new()), backend.clone());

        let ranked = engine.request_suggestions("u1", context(), TIMEOUT).await;
        assert_eq!(ranked.len(), 2);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_timeout_is_a_failure() {
        let backend = Arc::new(SlowBackend::default());
        let engine = orchestrator(Arc::new(InMemoryInterestStore::new()), backend.clone());

        let ranked = engine.request_suggestions("u1", context(), TIMEOUT).await;

        assert!(ranked.is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
        assert_eq!(engine.cache_stats().entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_timeout_honored() {
        let backend = Arc::new(SlowBackend::default());
        let engine = orchestrator(Arc::new(InMemoryInterestStore::new()), backend);

        let started = tokio::time::Instant::now();
        let ranked = engine
            .request_suggestions("u1", context(), Duration::from_millis(500))
            .await;

        assert!(ranked.is_empty());
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(engine.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_unreadable_store_serves_unpersonalized() {
        let store = Arc::new(FaultyStore::failing_reads());
        let backend = Arc::new(RecordingBackend::new(candidates()));
        let engine = orchestrator(store, backend.clone());

        let ranked = engine.request_suggestions("u1", context(), TIMEOUT).await;

        assert_eq!(ranked.len(), 2);
        assert!(!backend.last_directive().is_rich());
        assert_eq!(engine.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_second_request_served_from_cache() {
        let store = Arc::new(FaultyStore::default());
        let backend = Arc::new(RecordingBackend::new(candidates()));
        let engine = orchestrator(store.clone(), backend);

        engine.request_suggestions("u1", context(), TIMEOUT).await;
        engine.request_suggestions("u1", context(), TIMEOUT).await;

        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
        assert_eq!(engine.cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn test_stale_stored_confidence_is_recomputed() {
        let store = Arc::new(InMemoryInterestStore::new());
        let stale = UserInterests {
            personalization_confidence: 0.99,
            preferred_keywords: vec!["tomato".to_string()],
            ..UserInterests::new()
        };
        store.put("u1", &stale).await.unwrap();
        let backend = Arc::new(RecordingBackend::new(candidates()));
        let engine = orchestrator(store, backend.clone());

        let interests = engine.current_interests("u1").await;
        assert_eq!(interests.personalization_confidence, 0.0);

        let ranked = engine.request_suggestions("u1", context(), TIMEOUT).await;
        assert!(ranked.iter().all(|r| r.applied_bonus == 0.0));
        assert!(!backend.last_directive().is_rich());
    }

    // ============================================================================
    // Feedback
    // ============================================================================

    #[tokio::test]
    async fn test_feedback_written_through_to_store() {
        let store = Arc::new(InMemoryInterestStore::new());
        let engine = orchestrator(store.clone(), Arc::new(FixtureBackend::default()));

        engine.record_feedback(upvote("u1")).await.unwrap();

        let stored = store.get("u1").await.unwrap().unwrap();
        assert_eq!(stored.total_interactions, 1);
        assert_eq!(stored.keyword_relevance_scores["tomato"], 1.0);
        assert_eq!(engine.current_interests("u1").await.total_interactions, 1);
    }

    #[tokio::test]
    async fn test_cache_coherent_when_store_write_fails() {
        let store = Arc::new(FaultyStore::failing_writes());
        let backend = Arc::new(RecordingBackend::new(candidates()));
        let engine = orchestrator(store.clone(), backend.clone());

        for _ in 0..6 {
            engine.record_feedback(upvote("u1")).await.unwrap();
        }
        let ranked = engine.request_suggestions("u1", context(), TIMEOUT).await;

        assert!(store.inner.is_empty().await);
        assert!(backend.last_directive().is_rich());
        assert_eq!(ranked[0].suggestion.id, "tomato-tart");
        assert!(ranked[0].applied_bonus > 0.0);
    }

    #[tokio::test]
    async fn test_unreadable_store_feedback_kept_in_cache_only() {
        let store = Arc::new(FaultyStore::failing_reads());
        let engine = orchestrator(store.clone(), Arc::new(FixtureBackend::default()));
        let mut changes = engine.subscribe();

        let updated = engine.record_feedback(upvote("u1")).await.unwrap();

        assert_eq!(updated.total_interactions, 1);
        assert!(store.inner.is_empty().await);
        assert!(!changes.recv().await.unwrap().persisted);
        assert_eq!(engine.current_interests("u1").await.total_interactions, 1);
    }

    #[tokio::test]
    async fn test_rebuilt_record_never_overwrites_stored_history() {
        let store = Arc::new(FaultyStore::default());
        let history = UserInterests {
            total_positive_feedback: 50,
            total_interactions: 50,
            ..UserInterests::new()
        };
        store.inner.put("u1", &history).await.unwrap();
        store.fail_reads.store(true, Ordering::SeqCst);
        let engine = orchestrator(store.clone(), Arc::new(FixtureBackend::default()));

        engine.record_feedback(upvote("u1")).await.unwrap();
        let updated = engine.record_feedback(upvote("u1")).await.unwrap();

        assert_eq!(updated.total_interactions, 2);
        let stored = store.inner.get("u1").await.unwrap().unwrap();
        assert_eq!(stored.total_interactions, 50);

        // Once reads work again the next event builds on the stored history
        store.fail_reads.store(false, Ordering::SeqCst);
        let updated = engine.record_feedback(upvote("u1")).await.unwrap();
        assert_eq!(updated.total_interactions, 51);
        let stored = store.inner.get("u1").await.unwrap().unwrap();
        assert_eq!(stored.total_interactions, 51);
    }

    #[tokio::test]
    async fn test_feedback_terms_normalized_before_learning() {
        let backend = Arc::new(RecordingBackend::new(candidates()));
        let engine = orchestrator(Arc::new(InMemoryInterestStore::new()), backend);

        for _ in 0..10 {
            let mut event = upvote(" u1 ");
            event.keywords = vec!["Tomato".to_string(), "".to_string()];
            event.category = Some("Produce".to_string());
            engine.record_feedback(event).await.unwrap();
        }

        let interests = engine.current_interests("u1").await;
        assert_eq!(interests.preferred_keywords, vec!["tomato"]);
        assert_eq!(interests.preferred_categories, vec!["produce"]);

        let ranked = engine.request_suggestions("u1", context(), TIMEOUT).await;
        assert_eq!(ranked[0].suggestion.id, "tomato-tart");
        assert!(ranked[0].applied_bonus > 0.0);
    }

    #[tokio::test]
    async fn test_malformed_event_rejected() {
        let store = Arc::new(InMemoryInterestStore::new());
        let engine = orchestrator(store.clone(), Arc::new(FixtureBackend::default()));

        let result = engine.record_feedback(upvote("  ")).await;
        assert!(matches!(result, Err(EngineError::MalformedEvent(_))));

        let raw = RawFeedbackEvent {
            user_id: Some("u1".to_string()),
            ..Default::default()
        };
        let result = engine.record_raw_feedback(raw).await;
        assert!(matches!(result, Err(EngineError::MalformedEvent(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_change_notification_published() {
        let engine = orchestrator(
            Arc::new(InMemoryInterestStore::new()),
            Arc::new(FixtureBackend::default()),
        );
        let mut changes = engine.subscribe();

        for _ in 0..5 {
            engine.record_feedback(upvote("u1")).await.unwrap();
        }

        let mut last = None;
        while let Ok(change) = changes.try_recv() {
            last = Some(change);
        }
        let last = last.unwrap();
        assert_eq!(last.user_id, "u1");
        assert!(last.significant);
        assert!(last.persisted);
        assert!(last.confidence > 0.3);
    }

    #[tokio::test]
    async fn test_spawned_feedback_applies() {
        let engine = Arc::new(orchestrator(
            Arc::new(InMemoryInterestStore::new()),
            Arc::new(FixtureBackend::default()),
        ));

        let handle = engine.spawn_feedback(upvote("u1")).unwrap();
        handle.await.unwrap();

        assert_eq!(engine.current_interests("u1").await.total_interactions, 1);
        assert!(engine.spawn_feedback(upvote("")).is_err());
    }

    #[tokio::test]
    async fn test_users_do_not_interfere() {
        let backend = Arc::new(RecordingBackend::new(candidates()));
        let engine = orchestrator(Arc::new(InMemoryInterestStore::new()), backend.clone());

        for _ in 0..10 {
            engine.record_feedback(upvote("u1")).await.unwrap();
        }
        let ranked = engine.request_suggestions("u2", context(), TIMEOUT).await;

        assert!(ranked.iter().all(|r| r.applied_bonus == 0.0));
        assert!(!backend.last_directive().is_rich());
    }

    #[tokio::test]
    async fn test_purge_user() {
        let store = Arc::new(InMemoryInterestStore::new());
        let engine = orchestrator(store.clone(), Arc::new(FixtureBackend::default()));
        engine.record_feedback(upvote("u1")).await.unwrap();

        engine.purge_user("u1").await.unwrap();

        assert!(store.get("u1").await.unwrap().is_none());
        assert_eq!(engine.cache_stats().entries, 0);
        assert_eq!(engine.current_interests("u1").await.total_interactions, 0);
    }

    /// Holds every read until released, so a purge can land mid-request
    struct GatedStore {
        inner: InMemoryInterestStore,
        gate: tokio::sync::Semaphore,
    }

    #[async_trait]
    impl InterestStore for GatedStore {
        async fn get(&self, user_id: &str) -> StoreResult<Option<UserInterests>> {
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            permit.forget();
            self.inner.get(user_id).await
        }

        async fn put(&self, user_id: &str, interests: &UserInterests) -> StoreResult<()> {
            self.inner.put(user_id, interests).await
        }

        async fn delete(&self, user_id: &str) -> StoreResult<()> {
            self.inner.delete(user_id).await
        }
    }

    #[tokio::test]
    async fn test_in_flight_work_cannot_resurrect_purged_user() {
        let store = Arc::new(GatedStore {
            inner: InMemoryInterestStore::new(),
            gate: tokio::sync::Semaphore::new(0),
        });
        let warm = UserInterests {
            total_positive_feedback: 8,
            total_interactions: 8,
            ..UserInterests::new()
        };
        store.inner.put("u1", &warm).await.unwrap();
        let engine = Arc::new(orchestrator(
            store.clone(),
            Arc::new(RecordingBackend::new(candidates())),
        ));

        let request = tokio::spawn({
            let engine = engine.clone();
            async move { engine.request_suggestions("u1", context(), TIMEOUT).await }
        });
        let feedback = tokio::spawn({
            let engine = engine.clone();
            async move { engine.record_feedback(upvote("u1")).await }
        });
        // Let both reach the store read before the purge lands
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        engine.purge_user("u1").await.unwrap();
        store.gate.add_permits(2);

        assert_eq!(request.await.unwrap().len(), 2);
        feedback.await.unwrap().unwrap();

        assert!(store.inner.get("u1").await.unwrap().is_none());
        assert_eq!(engine.cache_stats().entries, 0);
    }
}
