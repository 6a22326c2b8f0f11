//! `src/cache/query_cache.rs`
//! ============================================================================
//! # Query cache for folder and image collections
//!
//! One cached collection per exact `(kind, folder)` key:
//! - lazy creation on first fetch, served while fresh
//! - request coalescing: concurrent fetches of a key share one remote call
//! - synchronous invalidation that only marks the key stale
//! - no hierarchical invalidation; folder membership is queried by id
//!
//! Every key carries a generation counter. `invalidate` bumps it, and loads
//! are coalesced per `(key, generation)`, so a load that started before an
//! invalidation can never satisfy a fetch issued after it. The newest loaded
//! generation is remembered to serve `peek` with a freshness flag.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use dashmap::DashMap;
use moka::future::Cache;
use tracing::{debug, error, info, instrument};

use crate::{
    config::CacheConfig,
    error::{ExplorerError, ExplorerResult},
    model::resource::{CacheKey, FolderId, FolderNode, ImageLeaf, ResourceKind},
    remote::ResourceClient,
};

/// A fetched collection of either kind.
#[derive(Debug, Clone)]
pub enum Listing {
    Folders(Arc<[FolderNode]>),
    Images(Arc<[ImageLeaf]>),
}

impl Listing {
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Folders(_) => ResourceKind::Folders,
            Self::Images(_) => ResourceKind::Images,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Folders(items) => items.len(),
            Self::Images(items) => items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Last-known value of a key plus whether it is still fresh.
#[derive(Debug, Clone)]
pub struct CachedCollection<T> {
    pub items: T,
    pub fresh: bool,
}

/// Cache statistics for monitoring and debugging
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
    invalidations: AtomicU64,
    total_load_time_ns: AtomicU64,
}

impl CacheStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[expect(clippy::cast_possible_truncation, reason = "Load times fit in u64 ns")]
    pub fn record_load(&self, duration: Duration, success: bool) {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.total_load_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);

        if !success {
            self.load_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        let loads: u64 = self.loads.load(Ordering::Relaxed);
        let total_load_time_ns = self.total_load_time_ns.load(Ordering::Relaxed);

        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads,
            load_failures: self.load_failures.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            average_load_time: if loads > 0 {
                Duration::from_nanos(total_load_time_ns / loads)
            } else {
                Duration::ZERO
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub loads: u64,
    pub load_failures: u64,
    pub invalidations: u64,
    pub average_load_time: Duration,
}

impl CacheStatsSnapshot {
    #[expect(clippy::cast_precision_loss, reason = "Expected precision loss")]
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Generation bookkeeping for one folder key. Generations come from a
/// store-wide counter, so a key re-created after `invalidate_all` never
/// reuses a number an older load may still hold.
#[derive(Debug, Clone, Copy, Default)]
struct KeyVersion {
    generation: u64,

    /// Newest generation whose load completed.
    loaded: Option<u64>,
}

/// Collections of one resource kind, keyed by folder and generation.
struct CollectionStore<T> {
    kind: ResourceKind,
    inner: Cache<(Option<FolderId>, u64), Arc<[T]>>,
    versions: DashMap<Option<FolderId>, KeyVersion>,
    next_generation: AtomicU64,

    /// Loads of generations below this started before the last `invalidate_all`.
    cleared_below: AtomicU64,
}

impl<T> CollectionStore<T>
where
    T: Send + Sync + 'static,
{
    fn new(kind: ResourceKind, config: &CacheConfig) -> Self {
        let inner = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl)
            .time_to_idle(config.tti)
            .build();

        Self {
            kind,
            inner,
            versions: DashMap::new(),
            next_generation: AtomicU64::new(1),
            cleared_below: AtomicU64::new(0),
        }
    }

    fn bump(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::AcqRel)
    }

    fn version(&self, folder: &Option<FolderId>) -> KeyVersion {
        self.versions
            .get(folder)
            .map(|entry| *entry.value())
            .unwrap_or_default()
    }

    /// Current generation, registering the key so `invalidate_all` sees it.
    fn current_generation(&self, folder: &Option<FolderId>) -> u64 {
        self.versions
            .entry(folder.clone())
            .or_insert_with(|| KeyVersion {
                generation: self.bump(),
                loaded: None,
            })
            .generation
    }

    async fn get_or_load<Fut>(
        &self,
        folder: Option<FolderId>,
        stats: &Arc<CacheStats>,
        enable_stats: bool,
        load: Fut,
    ) -> ExplorerResult<Arc<[T]>>
    where
        Fut: Future<Output = ExplorerResult<Vec<T>>> + Send,
    {
        let generation = self.current_generation(&folder);
        let cache_key = CacheKey::new(self.kind, folder.clone());
        let versioned = (folder.clone(), generation);

        // Fast path: fresh entry for the current generation
        if let Some(items) = self.inner.get(&versioned).await {
            if enable_stats {
                stats.record_hit();
            }
            debug!(
                marker = "CACHE_OPERATION",
                operation_type = "cache_hit",
                cache_key = %cache_key,
                generation,
                "Cache hit - serving fresh collection"
            );
            return Ok(items);
        }

        if enable_stats {
            stats.record_miss();
        }
        info!(
            marker = "CACHE_OPERATION",
            operation_type = "slow_path_loading",
            cache_key = %cache_key,
            generation,
            "Cache miss or stale - loading (coalesced)"
        );

        let load_start = Instant::now();
        let loader_stats = Arc::clone(stats);
        let loader_key = cache_key.clone();

        let result: Result<Arc<[T]>, Arc<ExplorerError>> = self
            .inner
            .try_get_with(versioned, async move {
                let load_result = load.await;
                let load_duration = load_start.elapsed();

                if enable_stats {
                    loader_stats.record_load(load_duration, load_result.is_ok());
                }

                match load_result {
                    Ok(items) => {
                        info!(
                            marker = "CACHE_OPERATION",
                            operation_type = "loader_success",
                            cache_key = %loader_key,
                            count = items.len(),
                            load_duration_ms = load_duration.as_millis(),
                            "Remote load succeeded, caching collection"
                        );
                        Ok(Arc::from(items))
                    }
                    Err(e) => {
                        error!(
                            marker = "CACHE_OPERATION",
                            operation_type = "loader_failure",
                            cache_key = %loader_key,
                            load_duration_ms = load_duration.as_millis(),
                            error = %e,
                            "Remote load failed, nothing cached"
                        );
                        Err(e)
                    }
                }
            })
            .await;

        match result {
            Ok(items) => {
                self.mark_loaded(folder, generation).await;
                Ok(items)
            }
            Err(e) => Err(ExplorerError::clone(&e)),
        }
    }

    /// Record a completed load and evict whichever generation lost: the
    /// previously loaded one, or this one if a newer load already landed.
    async fn mark_loaded(&self, folder: Option<FolderId>, generation: u64) {
        let evict = if generation < self.cleared_below.load(Ordering::Acquire) {
            Some(generation)
        } else {
            match self.versions.get_mut(&folder) {
                None => Some(generation),
                Some(mut version) => {
                    let previous = version.loaded;
                    if previous == Some(generation) {
                        None
                    } else if previous.is_some_and(|loaded| loaded > generation) {
                        Some(generation)
                    } else {
                        version.loaded = Some(generation);
                        previous
                    }
                }
            }
        };

        if let Some(stale) = evict {
            debug!(
                marker = "CACHE_OPERATION",
                operation_type = "evict_generation",
                cache_key = %CacheKey::new(self.kind, folder.clone()),
                generation = stale,
                "Dropping superseded collection"
            );
            self.inner.invalidate(&(folder, stale)).await;
        }
    }

    fn invalidate(&self, folder: &Option<FolderId>) {
        // Keys never fetched have nothing to mark.
        if let Some(mut version) = self.versions.get_mut(folder) {
            version.generation = self.bump();
        }
    }

    fn invalidate_all(&self) {
        self.cleared_below
            .store(self.next_generation.load(Ordering::Acquire), Ordering::Release);
        self.versions.clear();
        self.inner.invalidate_all();
    }

    async fn peek(&self, folder: &Option<FolderId>) -> Option<CachedCollection<Arc<[T]>>> {
        let version = self.version(folder);
        let loaded = version.loaded?;
        let items = self.inner.get(&(folder.clone(), loaded)).await?;

        Some(CachedCollection {
            items,
            fresh: loaded == version.generation,
        })
    }

    fn is_fresh(&self, folder: &Option<FolderId>) -> bool {
        let version = self.version(folder);
        version.loaded == Some(version.generation)
            && self.inner.contains_key(&(folder.clone(), version.generation))
    }

    fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

/// Per-location cache of folder and image listings.
pub struct QueryCache {
    client: Arc<dyn ResourceClient>,
    folders: CollectionStore<FolderNode>,
    images: CollectionStore<ImageLeaf>,
    config: CacheConfig,
    stats: Arc<CacheStats>,
    startup_time: Instant,
}

impl QueryCache {
    #[must_use]
    pub fn new(client: Arc<dyn ResourceClient>, config: CacheConfig) -> Self {
        Self {
            client,
            folders: CollectionStore::new(ResourceKind::Folders, &config),
            images: CollectionStore::new(ResourceKind::Images, &config),
            config,
            stats: Arc::new(CacheStats::default()),
            startup_time: Instant::now(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Serve `(kind, folder)` from cache if fresh, otherwise load it.
    pub async fn fetch(&self, kind: ResourceKind, folder: Option<&FolderId>) -> ExplorerResult<Listing> {
        match kind {
            ResourceKind::Folders => self.folders(folder).await.map(Listing::Folders),
            ResourceKind::Images => self.images(folder).await.map(Listing::Images),
        }
    }

    #[instrument(skip(self), fields(kind = "folders"))]
    pub async fn folders(&self, folder: Option<&FolderId>) -> ExplorerResult<Arc<[FolderNode]>> {
        let client = Arc::clone(&self.client);
        let parent = folder.cloned();
        let load = async move { client.list_folders(parent.as_ref()).await };

        self.folders
            .get_or_load(folder.cloned(), &self.stats, self.config.enable_stats, load)
            .await
    }

    #[instrument(skip(self), fields(kind = "images"))]
    pub async fn images(&self, folder: Option<&FolderId>) -> ExplorerResult<Arc<[ImageLeaf]>> {
        let client = Arc::clone(&self.client);
        let target = folder.cloned();
        let load = async move { client.list_images(target.as_ref()).await };

        self.images
            .get_or_load(folder.cloned(), &self.stats, self.config.enable_stats, load)
            .await
    }

    /// Mark `(kind, folder)` stale. Pure marking: never waits on I/O.
    pub fn invalidate(&self, kind: ResourceKind, folder: Option<&FolderId>) {
        let folder = folder.cloned();
        match kind {
            ResourceKind::Folders => self.folders.invalidate(&folder),
            ResourceKind::Images => self.images.invalidate(&folder),
        }

        if self.config.enable_stats {
            self.stats.record_invalidation();
        }
        info!(
            marker = "CACHE_OPERATION",
            operation_type = "cache_invalidate",
            cache_key = %CacheKey::new(kind, folder),
            "Marked collection stale"
        );
    }

    /// Drop everything (explorer session teardown).
    pub fn invalidate_all(&self) {
        self.folders.invalidate_all();
        self.images.invalidate_all();
        info!("Query cache cleared");
    }

    /// Last-known collection for a key, without touching the network.
    pub async fn peek(&self, kind: ResourceKind, folder: Option<&FolderId>) -> Option<CachedCollection<Listing>> {
        let folder = folder.cloned();
        match kind {
            ResourceKind::Folders => self.folders.peek(&folder).await.map(|c| CachedCollection {
                items: Listing::Folders(c.items),
                fresh: c.fresh,
            }),
            ResourceKind::Images => self.images.peek(&folder).await.map(|c| CachedCollection {
                items: Listing::Images(c.items),
                fresh: c.fresh,
            }),
        }
    }

    #[must_use]
    pub fn is_fresh(&self, kind: ResourceKind, folder: Option<&FolderId>) -> bool {
        let folder = folder.cloned();
        match kind {
            ResourceKind::Folders => self.folders.is_fresh(&folder),
            ResourceKind::Images => self.images.is_fresh(&folder),
        }
    }

    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.folders.entry_count() + self.images.entry_count()
    }

    /// Get cache statistics snapshot
    #[must_use]
    pub fn stats(&self) -> CacheStatsSnapshot {
        if self.config.enable_stats {
            self.stats.snapshot()
        } else {
            CacheStatsSnapshot::default()
        }
    }

    pub fn log_stats(&self) {
        if !self.config.enable_stats {
            debug!("Cache statistics are disabled");
            return;
        }

        let stats = self.stats();
        info!(
            "Query cache statistics:\n\
            Entries: {}\n\
            Hit Rate: {:.2}%\n\
            Total Hits: {}\n\
            Total Misses: {}\n\
            Loads: {} ({} failed)\n\
            Invalidations: {}\n\
            Average Load Time: {:?}\n\
            Uptime: {:?}",
            self.entry_count(),
            stats.hit_rate() * 100.0,
            stats.hits,
            stats.misses,
            stats.loads,
            stats.load_failures,
            stats.invalidations,
            stats.average_load_time,
            self.startup_time.elapsed()
        );
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("config", &self.config)
            .field("entry_count", &self.entry_count())
            .finish_non_exhaustive()
    }
}
