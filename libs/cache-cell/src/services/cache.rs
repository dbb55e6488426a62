use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use shared_models::Appointment;

use crate::models::{CacheKey, CacheStats, SubjectKind};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

// =====================================================================================
// METRICS
// =====================================================================================

#[derive(Debug, Default)]
pub struct CacheMetrics {
    pub hit_count: AtomicU64,
    pub miss_count: AtomicU64,
    pub invalidation_count: AtomicU64,
    pub expiration_count: AtomicU64,
}

impl CacheMetrics {
    pub fn record_hit(&self) {
        self.hit_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.miss_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation(&self) {
        self.invalidation_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expiration(&self) {
        self.expiration_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hit_count.load(Ordering::Relaxed);
        let misses = self.miss_count.load(Ordering::Relaxed);
        let total = hits + misses;

        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

// =====================================================================================
// CACHE
// =====================================================================================

struct CacheState {
    entries: HashMap<CacheKey, Vec<Appointment>>,
    // One freshness window for the whole cache, not per entry.
    window_started_at: Instant,
    // Bumped on every wholesale clear; loads that straddle a clear are dropped.
    generation: u64,
}

impl CacheState {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.window_started_at.elapsed() < ttl
    }

    fn reset(&mut self) {
        self.entries.clear();
        self.window_started_at = Instant::now();
        self.generation += 1;
    }
}

/// Read-through cache of appointment lists keyed by patient or doctor.
///
/// Entries are trusted only while the shared window is younger than the TTL.
/// Any successful booking or cancellation clears everything through
/// [`AvailabilityCache::invalidate_all`]. Readers hold the lock in shared mode,
/// so they never observe a half-cleared map.
pub struct AvailabilityCache {
    state: RwLock<CacheState>,
    ttl: Duration,
    metrics: CacheMetrics,
}

impl Default for AvailabilityCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl AvailabilityCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: RwLock::new(CacheState {
                entries: HashMap::new(),
                window_started_at: Instant::now(),
                generation: 0,
            }),
            ttl,
            metrics: CacheMetrics::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached list for `(kind, subject_id)`, or run `loader` and
    /// remember its result.
    ///
    /// The returned vector is always an owned copy. Loader errors are passed
    /// through untouched and nothing is cached for them.
    pub async fn get_or_load<F, Fut, E>(
        &self,
        kind: SubjectKind,
        subject_id: i64,
        loader: F,
    ) -> Result<Vec<Appointment>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Appointment>, E>>,
    {
        let key = CacheKey { kind, subject_id };

        let (generation, expired) = {
            let state = self.state.read().await;
            let fresh = state.is_fresh(self.ttl);
            if fresh {
                if let Some(cached) = state.entries.get(&key) {
                    self.metrics.record_hit();
                    debug!("Cache hit for {} {}", kind, subject_id);
                    return Ok(cached.clone());
                }
            }
            (state.generation, !fresh)
        };

        let generation = if expired {
            self.expire_window(generation).await
        } else {
            generation
        };

        self.metrics.record_miss();
        debug!("Cache miss for {} {}, loading from store", kind, subject_id);

        let loaded = loader().await?;

        let mut state = self.state.write().await;
        if state.generation == generation {
            state.entries.insert(key, loaded.clone());
        } else {
            debug!("Cache cleared while loading {} {}, result not cached", kind, subject_id);
        }

        Ok(loaded)
    }

    /// Drop every entry and restart the freshness window.
    pub async fn invalidate_all(&self) {
        let mut state = self.state.write().await;
        let dropped = state.entries.len();
        state.reset();
        self.metrics.record_invalidation();
        info!("Appointment cache invalidated ({} entries dropped)", dropped);
    }

    /// Start a new window once the old one has lapsed, so entries loaded from
    /// here on can be served again. Only the first reader to notice performs
    /// the reset; returns the generation new loads should be stored under.
    async fn expire_window(&self, seen_generation: u64) -> u64 {
        let mut state = self.state.write().await;
        if state.generation == seen_generation && !state.is_fresh(self.ttl) {
            state.reset();
            self.metrics.record_expiration();
            debug!("Appointment cache window expired");
        }
        state.generation
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> CacheStats {
        let total_entries = self.len().await as u64;

        CacheStats {
            hit_count: self.metrics.hit_count.load(Ordering::Relaxed),
            miss_count: self.metrics.miss_count.load(Ordering::Relaxed),
            invalidation_count: self.metrics.invalidation_count.load(Ordering::Relaxed),
            expiration_count: self.metrics.expiration_count.load(Ordering::Relaxed),
            total_entries,
            hit_rate: self.metrics.hit_rate(),
            ttl_seconds: self.ttl.as_secs(),
        }
    }
}
