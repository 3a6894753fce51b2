use crate::error::Result;
use crate::shortener::UrlStats;
use async_trait::async_trait;
use shortlane_core::record::day_of;
use shortlane_core::{Clock, ShortCode, UrlCache};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Page size hint passed to every `scan` call.
pub const DEFAULT_SCAN_COUNT: usize = 500;

/// Counts derived from the cache tier alone.
///
/// Every call walks the whole keyspace, so the cost grows with the number of
/// cached codes. Deduplicating the codes a scan may repeat also keeps every
/// seen code in memory until the walk finishes, so memory grows with the
/// keyspace too. Evicted codes are invisible and concurrent writes may or may
/// not be observed.
#[derive(Debug)]
pub struct StatsAggregator<C, K> {
    cache: Arc<C>,
    clock: Arc<K>,
    scan_count: usize,
}

impl<C, K> Clone for StatsAggregator<C, K> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            clock: Arc::clone(&self.clock),
            scan_count: self.scan_count,
        }
    }
}

impl<C: UrlCache, K: Clock> StatsAggregator<C, K> {
    pub fn new(cache: Arc<C>, clock: Arc<K>) -> Self {
        Self {
            cache,
            clock,
            scan_count: DEFAULT_SCAN_COUNT,
        }
    }

    pub fn with_scan_count(mut self, count: usize) -> Self {
        self.scan_count = count.max(1);
        self
    }
}

#[async_trait]
impl<C: UrlCache, K: Clock> UrlStats for StatsAggregator<C, K> {
    async fn total_count(&self) -> Result<u64> {
        let mut scan = KeyScan::new(self.cache.as_ref(), self.scan_count);
        let mut total = 0u64;

        while let Some(codes) = scan.next_page().await? {
            total += codes.len() as u64;
        }

        debug!(total, "Counted cached short codes");
        Ok(total)
    }

    async fn today_count(&self) -> Result<u64> {
        let today = day_of(&self.clock.now());
        let mut scan = KeyScan::new(self.cache.as_ref(), self.scan_count);
        let mut count = 0u64;

        while let Some(codes) = scan.next_page().await? {
            if codes.is_empty() {
                continue;
            }
            // Keys that expired since the scan come back as `None`.
            let records = self.cache.get_many(&codes).await?;
            count += records
                .iter()
                .flatten()
                .filter(|record| record.was_created_on(&today))
                .count() as u64;
        }

        debug!(today = %today, count, "Counted short codes created today");
        Ok(count)
    }
}

/// Cursor walk over the cache keyspace that yields each code at most once.
///
/// `seen` holds every code returned so far, one entry per distinct cached code.
struct KeyScan<'a, C> {
    cache: &'a C,
    count: usize,
    cursor: u64,
    done: bool,
    seen: HashSet<ShortCode>,
}

impl<'a, C: UrlCache> KeyScan<'a, C> {
    fn new(cache: &'a C, count: usize) -> Self {
        Self {
            cache,
            count,
            cursor: 0,
            done: false,
            seen: HashSet::new(),
        }
    }

    /// Returns the codes of the next page not yielded before, or `None` once
    /// the cursor has come back to zero.
    async fn next_page(&mut self) -> Result<Option<Vec<ShortCode>>> {
        if self.done {
            return Ok(None);
        }

        let page = self.cache.scan(self.cursor, self.count).await?;
        self.done = page.is_last();
        self.cursor = page.cursor;

        let fresh = page
            .codes
            .into_iter()
            .filter(|code| self.seen.insert(code.clone()))
            .collect();
        Ok(Some(fresh))
    }
}
