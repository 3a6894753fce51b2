use crate::error::Result;
use async_trait::async_trait;
use shortlane_core::ShortCode;

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Mints a new short code for `url` and returns it.
    async fn shorten(&self, url: &str) -> Result<ShortCode>;

    /// Resolves a short code to its original URL.
    /// Returns `None` if the code was never created.
    async fn resolve(&self, code: &ShortCode) -> Result<Option<String>>;
}

/// Approximate counters over the cache tier.
///
/// Only cached entries are visible, and concurrent writes may or may not be
/// included in a given result.
#[async_trait]
pub trait UrlStats: Send + Sync + 'static {
    /// Number of distinct codes currently cached.
    async fn total_count(&self) -> Result<u64>;

    /// Number of cached records whose `created_at` falls on today's date.
    async fn today_count(&self) -> Result<u64>;
}
