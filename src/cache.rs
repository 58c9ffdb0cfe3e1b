//! Snapshot cache
//!
//! TTL-bounded cache of post snapshots for the read paths. Decisions never
//! touch it; every admission, release and deletion invalidates the post's
//! entry, so a cached snapshot is at most `ttl` stale and never survives a
//! state change it should reflect.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::post::PostSnapshot;
use crate::types::PostId;

/// Configuration for the snapshot cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a snapshot may be served before it expires
    pub ttl: Duration,
    /// Upper bound on cached posts
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5),
            max_entries: 10_000,
        }
    }
}

/// Cache statistics for the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// TTL cache of post snapshots, keyed by post id.
pub struct SnapshotCache {
    entries: DashMap<PostId, (PostSnapshot, Instant)>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SnapshotCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Cached snapshot, if present and inside its TTL.
    pub fn get(&self, post: &PostId) -> Option<PostSnapshot> {
        if let Some(entry) = self.entries.get(post) {
            let (snapshot, cached_at) = entry.value();
            if cached_at.elapsed() < self.config.ttl {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(snapshot.clone());
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Cache a snapshot, unless the cache is full and the post is new to it.
    pub fn put(&self, snapshot: PostSnapshot) {
        if self.entries.len() >= self.config.max_entries && !self.entries.contains_key(&snapshot.id)
        {
            debug!(post_id = %snapshot.id, "snapshot cache full, not caching");
            return;
        }
        self.entries.insert(snapshot.id, (snapshot, Instant::now()));
    }

    /// Drop the entry for a post whose claim state just changed.
    pub fn invalidate(&self, post: &PostId) {
        self.entries.remove(post);
    }

    /// Drop entries past their TTL.
    pub fn cleanup(&self) {
        let ttl = self.config.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, (_, cached_at)| cached_at.elapsed() < ttl);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            info!(evicted, remaining = self.entries.len(), "snapshot cache cleanup");
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Spawn the periodic cleanup task for the cache.
pub fn spawn_cleanup_task(cache: Arc<SnapshotCache>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            cache.cleanup();
        }
    });
}
