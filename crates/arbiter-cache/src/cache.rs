//! The decision cache.

use arbiter_core::{AggregateResult, InvalidationTag};
use arbiter_events::{InvalidationBus, InvalidationEvent, InvalidationSubscriber, SubscriberId};
use lru::LruCache;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

use crate::key::CacheKey;
use crate::stats::{CacheStats, Counters};

/// Default maximum number of cached decisions.
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Cache sizing and expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries kept; least recently used are dropped first.
    pub capacity: NonZeroUsize,
    /// Maximum entry age. `None` keeps entries until evicted or invalidated.
    pub ttl: Option<Duration>,
}

impl CacheConfig {
    /// Create a config with the given capacity (clamped to at least 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            ttl: None,
        }
    }

    /// Set the entry TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

/// Snapshot of the invalidation state an evaluation started from.
///
/// Taken before providers are invoked and consumed by
/// [`ResultCache::store`]. If any of the ticket's tags was invalidated (or
/// the cache was cleared) in between, the store is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheTicket {
    epoch: u64,
    generations: Vec<(InvalidationTag, u64)>,
}

impl CacheTicket {
    /// Tags the guarded entry will carry.
    pub fn tags(&self) -> impl Iterator<Item = &InvalidationTag> {
        self.generations.iter().map(|(tag, _)| tag)
    }
}

struct CacheEntry {
    result: AggregateResult,
    created_at: Instant,
    tags: Vec<InvalidationTag>,
}

struct CacheState {
    entries: LruCache<CacheKey, CacheEntry>,
    index: HashMap<InvalidationTag, HashSet<CacheKey>>,
    generations: HashMap<InvalidationTag, u64>,
    epoch: u64,
}

impl CacheState {
    fn generation(&self, tag: &InvalidationTag) -> u64 {
        self.generations.get(tag).copied().unwrap_or(0)
    }

    fn unindex(&mut self, key: &CacheKey, tags: &[InvalidationTag]) {
        for tag in tags {
            if let Some(keys) = self.index.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.index.remove(tag);
                }
            }
        }
    }

    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = self.entries.pop(key)?;
        self.unindex(key, &entry.tags);
        Some(entry)
    }

    /// Forget per-tag generations once they outgrow `limit`.
    ///
    /// Bumping the epoch rejects every outstanding ticket, which is what a
    /// ticket holding one of the forgotten generations would have needed.
    fn prune_generations(&mut self, limit: usize) {
        if self.generations.len() > limit {
            debug!(
                tracked = self.generations.len(),
                "pruning tag generations; outstanding tickets are invalidated"
            );
            self.generations.clear();
            self.epoch = self.epoch.wrapping_add(1);
        }
    }
}

/// Bounded, tag-invalidated cache of permission decisions.
///
/// All state sits behind one mutex, so entries are replaced atomically and
/// invalidation is linearizable with lookups and stores: once
/// [`invalidate`](Self::invalidate) returns, no lookup can observe an entry
/// carrying that tag and no store holding an older ticket can succeed.
pub struct ResultCache {
    state: Mutex<CacheState>,
    config: CacheConfig,
    generation_limit: usize,
    counters: Counters,
}

impl ResultCache {
    /// Create a cache.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(config.capacity),
                index: HashMap::new(),
                generations: HashMap::new(),
                epoch: 0,
            }),
            generation_limit: config.capacity.get().saturating_mul(4).max(1024),
            config,
            counters: Counters::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| {
            warn!("ResultCache lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.config
            .ttl
            .is_some_and(|ttl| entry.created_at.elapsed() >= ttl)
    }

    /// Look up a cached decision, promoting it in LRU order.
    #[must_use]
    pub fn lookup(&self, key: &CacheKey) -> Option<AggregateResult> {
        let mut state = self.lock();
        let found = state
            .entries
            .get(key)
            .map(|entry| (!self.is_expired(entry)).then(|| entry.result.clone()));

        match found {
            Some(Some(result)) => {
                Counters::bump(&self.counters.hits);
                trace!(?key, "cache hit");
                Some(result)
            },
            Some(None) => {
                state.remove(key);
                Counters::bump(&self.counters.expirations);
                Counters::bump(&self.counters.misses);
                trace!(?key, "cache entry expired");
                None
            },
            None => {
                Counters::bump(&self.counters.misses);
                None
            },
        }
    }

    /// Take a ticket for an entry that will carry `tags`.
    #[must_use]
    pub fn ticket(&self, tags: Vec<InvalidationTag>) -> CacheTicket {
        let state = self.lock();
        let generations = tags
            .into_iter()
            .map(|tag| {
                let generation = state.generation(&tag);
                (tag, generation)
            })
            .collect();
        CacheTicket {
            epoch: state.epoch,
            generations,
        }
    }

    /// Store a decision computed under `ticket`.
    ///
    /// Returns `false` (and stores nothing) if any of the ticket's tags was
    /// invalidated, or the cache cleared, after the ticket was taken.
    pub fn store(&self, key: CacheKey, result: AggregateResult, ticket: CacheTicket) -> bool {
        let mut state = self.lock();

        let stale = ticket.epoch != state.epoch
            || ticket
                .generations
                .iter()
                .any(|(tag, generation)| state.generation(tag) != *generation);
        if stale {
            Counters::bump(&self.counters.rejected_stores);
            debug!(?key, "rejected stale cache store after invalidation");
            return false;
        }

        let tags: Vec<InvalidationTag> = ticket.generations.into_iter().map(|(t, _)| t).collect();
        let entry = CacheEntry {
            result,
            created_at: Instant::now(),
            tags: tags.clone(),
        };

        if let Some((old_key, old_entry)) = state.entries.push(key.clone(), entry) {
            state.unindex(&old_key, &old_entry.tags);
            if old_key != key {
                Counters::bump(&self.counters.evictions);
                trace!(key = ?old_key, "evicted least recently used entry");
            }
        }
        for tag in tags {
            state.index.entry(tag).or_default().insert(key.clone());
        }

        Counters::bump(&self.counters.stores);
        true
    }

    /// Evict every entry carrying `tag`. Returns the number evicted.
    ///
    /// Also rejects every outstanding ticket that includes `tag`.
    pub fn invalidate(&self, tag: &InvalidationTag) -> usize {
        let mut state = self.lock();

        let generation = state.generations.entry(tag.clone()).or_insert(0);
        *generation = generation.wrapping_add(1);

        let keys = state.index.remove(tag).unwrap_or_default();
        let mut removed: usize = 0;
        for key in &keys {
            if state.remove(key).is_some() {
                removed = removed.saturating_add(1);
            }
        }

        let limit = self.generation_limit;
        state.prune_generations(limit);
        drop(state);

        Counters::add(&self.counters.invalidations, removed);
        debug!(%tag, removed, "invalidated cached decisions");
        removed
    }

    /// Evict everything and reject every outstanding ticket.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let removed = state.entries.len();
        state.entries.clear();
        state.index.clear();
        state.generations.clear();
        state.epoch = state.epoch.wrapping_add(1);
        drop(state);

        Counters::add(&self.counters.invalidations, removed);
        debug!(removed, "cleared decision cache");
        removed
    }

    /// Subscribe this cache to a bus, evicting synchronously on every event.
    pub fn attach(self: &Arc<Self>, bus: &InvalidationBus) -> SubscriberId {
        bus.registry()
            .register(Arc::clone(self) as Arc<dyn InvalidationSubscriber>)
    }

    /// Number of cached decisions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.config.capacity.get()
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }
}

impl InvalidationSubscriber for ResultCache {
    fn on_invalidation(&self, event: &InvalidationEvent) {
        match &event.tag {
            Some(tag) => {
                self.invalidate(tag);
            },
            None => {
                self.clear();
            },
        }
    }

    fn name(&self) -> &str {
        "result-cache"
    }
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("ttl", &self.config.ttl)
            .finish_non_exhaustive()
    }
}
