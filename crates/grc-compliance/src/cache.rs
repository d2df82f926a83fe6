//! Versioned per-tenant score cache
//!
//! Entries carry the tenant generation they were computed at. Any answer or
//! overlay change bumps the generation, so a stale board is never served
//! even if it races with the write that invalidated it.

use crate::config::CacheConfig;
use crate::scoring::ScoreBoard;
use dashmap::DashMap;
use grc_common::TenantId;
use moka::sync::Cache;
use std::sync::Arc;

/// Score board cache with LRU eviction
pub struct ScoreCache {
    boards: Cache<TenantId, (u64, Arc<ScoreBoard>)>,
    generations: DashMap<TenantId, u64>,
    /// Bumped on catalog reload; folded into every tenant generation
    epoch: std::sync::atomic::AtomicU64,
}

impl ScoreCache {
    /// Create cache
    pub fn new(config: &CacheConfig) -> Self {
        let boards = Cache::builder()
            .max_capacity(config.capacity)
            .time_to_live(config.ttl())
            .build();

        Self {
            boards,
            generations: DashMap::new(),
            epoch: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Current generation for a tenant
    #[inline]
    pub fn generation(&self, tenant: TenantId) -> u64 {
        let local = self.generations.get(&tenant).map_or(0, |g| *g);
        let epoch = self.epoch.load(std::sync::atomic::Ordering::Acquire);
        (epoch << 32) | (local & 0xFFFF_FFFF)
    }

    /// Cached board if computed at `generation`
    #[inline]
    pub fn get(&self, tenant: TenantId, generation: u64) -> Option<Arc<ScoreBoard>> {
        self.boards
            .get(&tenant)
            .and_then(|(version, board)| (version == generation).then_some(board))
    }

    /// Store a board computed at `generation`
    pub fn insert(&self, tenant: TenantId, generation: u64, board: Arc<ScoreBoard>) {
        if generation != self.generation(tenant) {
            // Invalidated while computing
            return;
        }
        self.boards.insert(tenant, (generation, board));
    }

    /// Drop a tenant's cached scores
    pub fn invalidate(&self, tenant: TenantId) {
        *self.generations.entry(tenant).or_insert(0) += 1;
        self.boards.invalidate(&tenant);
    }

    /// Drop every tenant's cached scores
    pub fn invalidate_all(&self) {
        self.epoch.fetch_add(1, std::sync::atomic::Ordering::AcqRel);
        self.boards.invalidate_all();
    }

    /// Approximate entry count
    pub fn len(&self) -> u64 {
        self.boards.entry_count()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.boards.entry_count() == 0
    }
}

impl Default for ScoreCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn board(global: u32) -> Arc<ScoreBoard> {
        Arc::new(ScoreBoard {
            global,
            ..Default::default()
        })
    }

    #[test]
    fn test_cache_hit() {
        let cache = ScoreCache::default();
        let tenant = Uuid::new_v4();
        let generation = cache.generation(tenant);

        cache.insert(tenant, generation, board(80));
        assert_eq!(cache.get(tenant, generation).unwrap().global, 80);

        // Miss with different generation
        assert!(cache.get(tenant, generation + 1).is_none());
    }

    #[test]
    fn test_invalidate_is_tenant_scoped() {
        let cache = ScoreCache::default();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        cache.insert(a, cache.generation(a), board(10));
        cache.insert(b, cache.generation(b), board(20));

        cache.invalidate(a);
        assert!(cache.get(a, cache.generation(a)).is_none());
        assert_eq!(cache.get(b, cache.generation(b)).unwrap().global, 20);
    }

    #[test]
    fn test_stale_insert_dropped() {
        let cache = ScoreCache::default();
        let tenant = Uuid::new_v4();
        let generation = cache.generation(tenant);

        cache.invalidate(tenant);
        cache.insert(tenant, generation, board(50));
        assert!(cache.get(tenant, cache.generation(tenant)).is_none());
    }

    #[test]
    fn test_invalidate_all_changes_generation() {
        let cache = ScoreCache::default();
        let tenant = Uuid::new_v4();
        let before = cache.generation(tenant);
        cache.insert(tenant, before, board(70));

        cache.invalidate_all();
        assert_ne!(cache.generation(tenant), before);
        assert!(cache.get(tenant, cache.generation(tenant)).is_none());
    }
}
