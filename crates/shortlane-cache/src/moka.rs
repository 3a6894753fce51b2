use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use shortlane_core::{CacheError, CachedRecord, ScanPage, ShortCode, UrlCache};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Type alias for cache results.
pub type Result<T> = std::result::Result<T, CacheError>;

const DEFAULT_MAX_CAPACITY: u64 = 100_000;

#[derive(Debug, Clone)]
struct Entry {
    record: CachedRecord,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with. Rewriting a key
/// restarts its clock with the new TTL.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// An in-memory cache implementation using Moka.
///
/// Suited to single-node deployments and tests. Besides TTL expiry, entries
/// may be evicted once `max_capacity` is reached, which keeps it as lossy as
/// the Redis tier.
#[derive(Debug, Clone)]
pub struct MokaUrlCache {
    cache: Cache<String, Entry>,
}

impl MokaUrlCache {
    /// Creates a new Moka URL cache holding up to 100,000 entries.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    /// Creates a new Moka URL cache with a custom maximum capacity.
    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }
}

impl Default for MokaUrlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlCache for MokaUrlCache {
    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        trace!(code = %code, "Probing Moka cache");
        Ok(self.cache.get(code.as_str()).await.is_some())
    }

    async fn get_url(&self, code: &ShortCode) -> Result<Option<CachedRecord>> {
        trace!(code = %code, "Fetching URL record from Moka cache");

        match self.cache.get(code.as_str()).await {
            Some(entry) => {
                debug!(code = %code, "Cache hit in Moka");
                Ok(Some(entry.record))
            }
            None => {
                trace!(code = %code, "Cache miss in Moka");
                Ok(None)
            }
        }
    }

    async fn set_url(&self, code: &ShortCode, record: &CachedRecord, ttl: Duration) -> Result<()> {
        trace!(code = %code, ttl_secs = ttl.as_secs(), "Storing URL record in Moka cache");

        let entry = Entry {
            record: record.clone(),
            ttl,
        };
        self.cache.insert(code.as_str().to_string(), entry).await;
        debug!(code = %code, "Cached record in Moka");
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        trace!(code = %code, "Removing URL record from Moka cache");

        self.cache.invalidate(code.as_str()).await;
        debug!(code = %code, "Removed record from Moka cache (if present)");
        Ok(())
    }

    /// Returns every live key in a single page.
    async fn scan(&self, cursor: u64, _count: usize) -> Result<ScanPage> {
        if cursor != 0 {
            return Ok(ScanPage::default());
        }

        let codes = self
            .cache
            .iter()
            .map(|(key, _)| ShortCode::new_unchecked(key.as_str()))
            .collect::<Vec<_>>();
        trace!(count = codes.len(), "Scanned Moka cache");
        Ok(ScanPage { cursor: 0, codes })
    }
}
