use crate::error::CacheError;
use crate::record::CachedRecord;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// One page of a key scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor for the next call. `0` means the scan is complete.
    pub cursor: u64,
    /// Codes found on this page. A code may show up on more than one page.
    pub codes: Vec<ShortCode>,
}

impl ScanPage {
    pub fn is_last(&self) -> bool {
        self.cursor == 0
    }
}

/// A time-bounded cache of [`CachedRecord`]s keyed by [`ShortCode`].
///
/// Entries may disappear at any time (TTL expiry, eviction). Expired
/// entries behave exactly like missing ones.
#[async_trait]
pub trait UrlCache: Send + Sync + 'static {
    /// Checks whether a live entry exists for the code.
    async fn exists(&self, code: &ShortCode) -> Result<bool>;

    /// Get the record from cache.
    ///
    /// Returns `Ok(None)` if the key is not in the cache, and
    /// `Err(InvalidData)` if the stored value cannot be decoded.
    async fn get_url(&self, code: &ShortCode) -> Result<Option<CachedRecord>>;

    /// Fetches several records at once, in the order of `codes`.
    ///
    /// Missing and undecodable entries come back as `None`.
    async fn get_many(&self, codes: &[ShortCode]) -> Result<Vec<Option<CachedRecord>>> {
        let mut records = Vec::with_capacity(codes.len());
        for code in codes {
            match self.get_url(code).await {
                Ok(record) => records.push(record),
                Err(CacheError::InvalidData(reason)) => {
                    warn!(code = %code, reason = %reason, "Skipping undecodable cache entry");
                    records.push(None);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    /// Store the record, expiring after `ttl`.
    async fn set_url(&self, code: &ShortCode, record: &CachedRecord, ttl: Duration)
        -> Result<()>;

    /// Remove the record. It is not an error if the key does not exist.
    async fn del(&self, code: &ShortCode) -> Result<()>;

    /// Returns one page of cached codes starting at `cursor` (`0` to begin).
    ///
    /// `count` is a hint for the page size. Callers keep calling with the
    /// returned cursor until it comes back as `0`.
    async fn scan(&self, cursor: u64, count: usize) -> Result<ScanPage>;

    /// Releases connections held by the cache.
    async fn close(&self) {}
}
