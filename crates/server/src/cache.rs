//! # Personalization Cache
//!
//! Time-bounded, per-user cache of interest records in front of the store.
//!
//! ## Policy
//!
//! - A read returns an entry only while it is younger than the TTL;
//!   stale entries are dropped and count as misses.
//! - A write replaces the entry and resets its age, so a user's next
//!   read sees their own feedback without waiting for the store.
//! - Capacity is capped with LRU eviction.
//! - Entries are `Arc`s: readers keep the value they were handed even if
//!   a write lands right after.
//! - Each entry records whether it descends from the stored record. One
//!   rebuilt after a failed store read must never be written back.
//!
//! ## Purges
//!
//! Purging a user leaves a tombstone stamped with a purge epoch. Callers
//! take `epoch()` before they load a record and hand it back with their
//! write; a write that started before the user's latest purge is refused,
//! so in-flight work cannot resurrect a deleted account. Tombstones expire
//! with the TTL.
//!
//! Writes are last-writer-wins per key; the lock is held only for the map
//! operation itself, never across an await.

use crate::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use interests::{UserId, UserInterests};
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// A cached record and where it came from
#[derive(Debug, Clone)]
pub struct CachedInterests {
    pub interests: Arc<UserInterests>,
    /// False when the record was rebuilt after the store could not be read
    pub store_backed: bool,
}

struct CacheEntry {
    cached: CachedInterests,
    fetched_at: DateTime<Utc>,
}

struct Tombstone {
    epoch: u64,
    purged_at: DateTime<Utc>,
}

struct CacheState {
    entries: LruCache<UserId, CacheEntry>,
    tombstones: HashMap<UserId, Tombstone>,
    epoch: u64,
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

pub struct PersonalizationCache {
    state: Mutex<CacheState>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl PersonalizationCache {
    pub fn new(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                tombstones: HashMap::new(),
                epoch: 0,
            }),
            ttl,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Current purge epoch; take it before loading a record to write back.
    pub fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    /// Return the cached record if it is younger than the TTL
    pub fn get_fresh(&self, user_id: &str) -> Option<CachedInterests> {
        let now = self.clock.now();
        let mut state = self.state.lock();

        let lookup = state
            .entries
            .get(user_id)
            .map(|entry| (entry.cached.clone(), now - entry.fetched_at < self.ttl));
        let fresh = match lookup {
            Some((cached, true)) => Some(cached),
            Some((_, false)) => {
                state.entries.pop(user_id);
                debug!(user_id, "Cache entry expired");
                None
            }
            None => None,
        };
        drop(state);

        match fresh {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        fresh
    }

    /// Store a record, resetting its age.
    ///
    /// Returns false, storing nothing, if the user was purged after `epoch`.
    pub fn put(&self, user_id: &str, cached: CachedInterests, epoch: u64) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock();
        if self.purged_after(&state, user_id, epoch, now) {
            return false;
        }

        let entry = CacheEntry {
            cached,
            fetched_at: now,
        };
        self.push_entry(&mut state.entries, user_id, entry);
        true
    }

    /// Store a record loaded from the store, unless a write got there first
    /// or the user was purged after `epoch`.
    ///
    /// Returns whether the record was inserted.
    pub fn insert_if_absent(&self, user_id: &str, interests: Arc<UserInterests>, epoch: u64) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let occupied = state
            .entries
            .peek(user_id)
            .is_some_and(|entry| now - entry.fetched_at < self.ttl);
        if occupied || self.purged_after(&state, user_id, epoch, now) {
            return false;
        }

        let entry = CacheEntry {
            cached: CachedInterests {
                interests,
                store_backed: true,
            },
            fetched_at: now,
        };
        self.push_entry(&mut state.entries, user_id, entry);
        true
    }

    /// Whether the user was purged after `epoch`
    pub fn purged_since(&self, user_id: &str, epoch: u64) -> bool {
        let now = self.clock.now();
        let state = self.state.lock();
        self.purged_after(&state, user_id, epoch, now)
    }

    /// Drop a user's entry and leave a tombstone. Returns whether an entry
    /// was present.
    pub fn purge(&self, user_id: &str) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.epoch += 1;
        let epoch = state.epoch;

        let ttl = self.ttl;
        state
            .tombstones
            .retain(|_, tombstone| now - tombstone.purged_at < ttl);
        state.tombstones.insert(
            user_id.to_string(),
            Tombstone {
                epoch,
                purged_at: now,
            },
        );
        state.entries.pop(user_id).is_some()
    }

    fn purged_after(&self, state: &CacheState, user_id: &str, epoch: u64, now: DateTime<Utc>) -> bool {
        state
            .tombstones
            .get(user_id)
            .is_some_and(|t| t.epoch > epoch && now - t.purged_at < self.ttl)
    }

    fn push_entry(&self, entries: &mut LruCache<UserId, CacheEntry>, user_id: &str, entry: CacheEntry) {
        let displaced = entries.push(user_id.to_string(), entry);
        if let Some((evicted, _)) = displaced.filter(|(key, _)| key.as_str() != user_id) {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(user_id = %evicted, "Evicted least recently used cache entry");
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
