//! In-memory cache for MDQ lookups.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use proxy_saml::EntityDescriptor;

/// Default number of entities held before the oldest is evicted.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Default lifetime of a cached entity.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug)]
struct CachedEntity {
    descriptor: EntityDescriptor,
    fetched_at: Instant,
}

/// Bounded, time-limited cache of entity metadata keyed by entity ID.
///
/// Cloning shares the underlying storage.
#[derive(Debug, Clone)]
pub struct MdqCache {
    entries: Arc<DashMap<String, CachedEntity>>,
    capacity: usize,
    ttl: Duration,
}

impl Default for MdqCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl MdqCache {
    /// Creates a cache holding at most `capacity` entities for `ttl` each.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Returns a fresh entry, dropping it if it has outlived the TTL.
    #[must_use]
    pub fn get(&self, entity_id: &str) -> Option<EntityDescriptor> {
        {
            let entry = self.entries.get(entity_id)?;
            if entry.fetched_at.elapsed() < self.ttl {
                return Some(entry.descriptor.clone());
            }
        }
        self.entries.remove(entity_id);
        None
    }

    /// Stores an entity, evicting the oldest entry when full.
    pub fn insert(&self, entity_id: impl Into<String>, descriptor: EntityDescriptor) {
        let entity_id = entity_id.into();
        if !self.entries.contains_key(&entity_id) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.entries.insert(
            entity_id,
            CachedEntity {
                descriptor,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Number of cached entities, fresh or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().fetched_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            tracing::debug!(entity_id = %key, "evicting cached metadata");
            self.entries.remove(&key);
        }
    }
}
