use crate::error::{Result, ShortenerError};
use crate::mint::CodeMinter;
use crate::policy::{CachePolicy, ShortenerConfig};
use crate::shortener::{Shortener, UrlStats};
use crate::stats::StatsAggregator;
use async_trait::async_trait;
use jiff::Zoned;
use shortlane_core::{
    CachedRecord, Clock, Repository, ShortCode, StorageError, SystemClock, UrlCache,
    UrlRow,
};
use shortlane_generator::Generator;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Coordinates the durable store and the cache.
///
/// Writes go to the durable store first and are then mirrored into the cache
/// with the initial TTL. Reads are served from the cache when possible; a
/// miss or a failing cache falls back to the durable store and writes a
/// repair record with the repair TTL. Write-path failures are surfaced, never
/// retried, and a failed cache write after a successful insert is not rolled
/// back. On the read path only durable-store failures are surfaced.
#[derive(Debug)]
pub struct ShortenerService<R, C, G, K = SystemClock> {
    repository: Arc<R>,
    cache: Arc<C>,
    minter: CodeMinter<G, C>,
    stats: StatsAggregator<C, K>,
    clock: Arc<K>,
    policy: CachePolicy,
}

impl<R, C, G, K> Clone for ShortenerService<R, C, G, K> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            cache: Arc::clone(&self.cache),
            minter: self.minter.clone(),
            stats: self.stats.clone(),
            clock: Arc::clone(&self.clock),
            policy: self.policy.clone(),
        }
    }
}

impl<R: Repository, C: UrlCache, G: Generator> ShortenerService<R, C, G, SystemClock> {
    /// Creates a service that reads the system clock.
    pub fn new(repository: R, cache: C, generator: G, config: ShortenerConfig) -> Self {
        Self::with_clock(repository, cache, generator, SystemClock, config)
    }
}

impl<R: Repository, C: UrlCache, G: Generator, K: Clock> ShortenerService<R, C, G, K> {
    pub fn with_clock(
        repository: R,
        cache: C,
        generator: G,
        clock: K,
        config: ShortenerConfig,
    ) -> Self {
        let cache = Arc::new(cache);
        let clock = Arc::new(clock);

        Self {
            repository: Arc::new(repository),
            minter: CodeMinter::new(Arc::new(generator), Arc::clone(&cache), config.max_attempts)
                .with_reserved(config.reserved_codes),
            stats: StatsAggregator::new(Arc::clone(&cache), Arc::clone(&clock)),
            cache,
            clock,
            policy: config.policy,
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn stats(&self) -> &StatsAggregator<C, K> {
        &self.stats
    }

    /// Releases the durable store and the cache.
    pub async fn close(&self) {
        self.repository.close().await;
        self.cache.close().await;
        info!("Shortener backends closed");
    }

    fn validate_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(ShortenerError::InvalidUrl(
                "URL cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Mints codes until one is accepted by the durable store.
    ///
    /// A primary-key conflict counts against the same budget as a cache
    /// collision, so an existing row is never overwritten.
    async fn persist(&self, row: &UrlRow) -> Result<ShortCode> {
        let budget = self.minter.max_attempts();

        for attempt in 1..=budget {
            let code = self.minter.mint().await?;
            match self.repository.insert(&code, row).await {
                Ok(()) => return Ok(code),
                Err(StorageError::Conflict(_)) => {
                    debug!(code = %code, attempt, "Code already persisted, redrawing");
                }
                Err(err) => {
                    warn!(code = %code, error = %err, "Failed to persist short code");
                    return Err(err.into());
                }
            }
        }

        warn!(attempts = budget, "Every minted code conflicted in the durable store");
        Err(ShortenerError::NamespaceExhausted { attempts: budget })
    }

    fn repair_record(&self, row: &UrlRow, now: &Zoned) -> CachedRecord {
        if self.policy.repair_refreshes_created_at {
            CachedRecord::new(row.url.as_str(), now)
        } else {
            let created_at = row.created_at.to_zoned(now.time_zone().clone());
            CachedRecord::new(row.url.as_str(), &created_at)
        }
    }
}

#[async_trait]
impl<R: Repository, C: UrlCache, G: Generator, K: Clock> Shortener for ShortenerService<R, C, G, K> {
    async fn shorten(&self, url: &str) -> Result<ShortCode> {
        Self::validate_url(url)?;

        let now = self.clock.now();
        let row = UrlRow {
            url: url.to_string(),
            created_at: now.timestamp(),
        };
        let code = self.persist(&row).await?;

        let record = CachedRecord::new(url, &now);
        if let Err(err) = self
            .cache
            .set_url(&code, &record, self.policy.initial_ttl)
            .await
        {
            warn!(code = %code, error = %err, "Persisted short code but failed to cache it");
            return Err(err.into());
        }

        debug!(code = %code, url = %url, "Shortened URL");
        Ok(code)
    }

    async fn resolve(&self, code: &ShortCode) -> Result<Option<String>> {
        trace!(code = %code, "Resolving short code");

        match self.cache.get_url(code).await {
            Ok(Some(record)) => {
                debug!(code = %code, "Cache hit");
                return Ok(Some(record.url));
            }
            Ok(None) => trace!(code = %code, "Cache miss"),
            // Undecodable values and transport failures alike fall back to
            // the durable store.
            Err(err) => {
                warn!(code = %code, error = %err, "Cache read failed, treating as miss");
            }
        }

        let Some(row) = self.repository.lookup(code).await? else {
            trace!(code = %code, "Short code not found");
            return Ok(None);
        };

        let record = self.repair_record(&row, &self.clock.now());
        if let Err(err) = self
            .cache
            .set_url(code, &record, self.policy.repair_ttl)
            .await
        {
            warn!(code = %code, error = %err, "Failed to repair cache entry");
        } else {
            debug!(code = %code, "Repaired cache entry from durable store");
        }

        Ok(Some(row.url))
    }
}

#[async_trait]
impl<R: Repository, C: UrlCache, G: Generator, K: Clock> UrlStats for ShortenerService<R, C, G, K> {
    async fn total_count(&self) -> Result<u64> {
        self.stats.total_count().await
    }

    async fn today_count(&self) -> Result<u64> {
        self.stats.today_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::{SignedDuration, Timestamp};
    use shortlane_cache::MokaUrlCache;
    use shortlane_core::{CacheError, ManualClock, ReadRepository, ScanPage};
    use shortlane_generator::{RandomGenerator, RandomGeneratorSettings};
    use shortlane_storage::InMemoryRepository;
    use std::collections::{HashSet, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    type StorageResult<T> = shortlane_core::repository::Result<T>;
    type CacheResult<T> = shortlane_core::cache::Result<T>;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn clock() -> ManualClock {
        ManualClock::new("2024-05-10T12:00:00+00:00[UTC]".parse().unwrap())
    }

    fn row(url: &str, created_at: &str) -> UrlRow {
        UrlRow {
            url: url.to_string(),
            created_at: created_at.parse::<Timestamp>().unwrap(),
        }
    }

    /// Counts durable lookups and can be told to fail every call.
    #[derive(Default)]
    struct ProbeRepository {
        inner: InMemoryRepository,
        lookups: AtomicUsize,
        inserts: AtomicUsize,
        down: bool,
    }

    impl ProbeRepository {
        fn down() -> Self {
            Self {
                down: true,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ReadRepository for ProbeRepository {
        async fn lookup(&self, code: &ShortCode) -> StorageResult<Option<UrlRow>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.down {
                return Err(StorageError::Unavailable("database is down".into()));
            }
            self.inner.lookup(code).await
        }
    }

    #[async_trait]
    impl Repository for ProbeRepository {
        async fn insert(&self, code: &ShortCode, row: &UrlRow) -> StorageResult<()> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            if self.down {
                return Err(StorageError::Unavailable("database is down".into()));
            }
            self.inner.insert(code, row).await
        }
    }

    /// Moka-backed cache whose reads or writes can be made to fail.
    #[derive(Default)]
    struct FlakyCache {
        inner: MokaUrlCache,
        get_error: Option<CacheError>,
        fail_writes: bool,
    }

    #[async_trait]
    impl UrlCache for FlakyCache {
        async fn exists(&self, code: &ShortCode) -> CacheResult<bool> {
            self.inner.exists(code).await
        }

        async fn get_url(&self, code: &ShortCode) -> CacheResult<Option<CachedRecord>> {
            match &self.get_error {
                Some(err) => Err(err.clone()),
                None => self.inner.get_url(code).await,
            }
        }

        async fn set_url(
            &self,
            code: &ShortCode,
            record: &CachedRecord,
            ttl: Duration,
        ) -> CacheResult<()> {
            if self.fail_writes {
                return Err(CacheError::Timeout("write timed out".into()));
            }
            self.inner.set_url(code, record, ttl).await
        }

        async fn del(&self, code: &ShortCode) -> CacheResult<()> {
            self.inner.del(code).await
        }

        async fn scan(&self, cursor: u64, count: usize) -> CacheResult<ScanPage> {
            self.inner.scan(cursor, count).await
        }
    }

    struct Scripted(Mutex<VecDeque<&'static str>>);

    impl Scripted {
        fn new(codes: &[&'static str]) -> Self {
            Self(Mutex::new(codes.iter().copied().collect()))
        }
    }

    impl Generator for Scripted {
        type Output = ShortCode;

        fn generate(&self) -> ShortCode {
            code(self.0.lock().unwrap().pop_front().expect("script ran out"))
        }
    }

    type TestService<R = ProbeRepository, C = FlakyCache, G = RandomGenerator> =
        ShortenerService<R, C, G, ManualClock>;

    fn service_with<R: Repository, C: UrlCache, G: Generator>(
        repository: R,
        cache: C,
        generator: G,
        policy: CachePolicy,
    ) -> TestService<R, C, G> {
        ShortenerService::with_clock(
            repository,
            cache,
            generator,
            clock(),
            ShortenerConfig::builder().policy(policy).build(),
        )
    }

    fn service() -> TestService {
        service_with(
            ProbeRepository::default(),
            FlakyCache::default(),
            RandomGenerator::default(),
            CachePolicy::default(),
        )
    }

    #[tokio::test]
    async fn shorten_then_resolve_hits_the_cache() {
        let service = service();

        let c = service.shorten("https://example.com/a").await.unwrap();
        assert_eq!(c.as_str().len(), 8);
        assert!(c.as_str().chars().all(|ch| ch.is_ascii_alphanumeric()));

        let url = service.resolve(&c).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://example.com/a"));
        assert_eq!(service.repository.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn shorten_writes_both_tiers() {
        let service = service();
        let c = service.shorten("https://example.com/a").await.unwrap();

        let durable = service.repository.lookup(&c).await.unwrap().unwrap();
        assert_eq!(durable, row("https://example.com/a", "2024-05-10T12:00:00Z"));

        let cached = service.cache.get_url(&c).await.unwrap().unwrap();
        assert_eq!(cached.url, "https://example.com/a");
        assert_eq!(cached.created_at, "2024-05-10T12:00:00+00:00");
    }

    #[tokio::test]
    async fn empty_url_touches_no_storage() {
        let service = service();

        for url in ["", "   "] {
            let err = service.shorten(url).await.unwrap_err();
            assert!(matches!(err, ShortenerError::InvalidUrl(_)));
        }
        assert_eq!(service.repository.inserts.load(Ordering::SeqCst), 0);
        assert_eq!(service.total_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn evicted_code_is_repaired_from_the_durable_store() {
        let service = service();
        let c = service.shorten("https://example.com/a").await.unwrap();

        service.cache.del(&c).await.unwrap();
        assert!(!service.cache.exists(&c).await.unwrap());

        let url = service.resolve(&c).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://example.com/a"));
        assert_eq!(service.repository.lookups.load(Ordering::SeqCst), 1);
        assert!(service.cache.exists(&c).await.unwrap());

        // Served from the repaired entry.
        service.resolve(&c).await.unwrap();
        assert_eq!(service.repository.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let service = service();
        assert_eq!(service.resolve(&code("doesnotexist")).await.unwrap(), None);
        assert!(!service.cache.exists(&code("doesnotexist")).await.unwrap());
    }

    #[tokio::test]
    async fn repaired_record_counts_as_today() {
        let repository = ProbeRepository::default();
        repository
            .inner
            .insert(&code("old00001"), &row("https://old.example", "2024-05-01T08:00:00Z"))
            .await
            .unwrap();
        let service = service_with(
            repository,
            FlakyCache::default(),
            RandomGenerator::default(),
            CachePolicy::default(),
        );

        assert_eq!(service.today_count().await.unwrap(), 0);
        service.resolve(&code("old00001")).await.unwrap();

        let cached = service.cache.get_url(&code("old00001")).await.unwrap().unwrap();
        assert_eq!(cached.created_at, "2024-05-10T12:00:00+00:00");
        assert_eq!(service.today_count().await.unwrap(), 1);
        assert_eq!(service.total_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn repair_can_keep_the_durable_creation_time() {
        let repository = ProbeRepository::default();
        repository
            .inner
            .insert(&code("old00001"), &row("https://old.example", "2024-05-01T08:00:00Z"))
            .await
            .unwrap();
        let policy = CachePolicy::builder()
            .repair_refreshes_created_at(false)
            .build();
        let service = service_with(
            repository,
            FlakyCache::default(),
            RandomGenerator::default(),
            policy,
        );

        service.resolve(&code("old00001")).await.unwrap();

        let cached = service.cache.get_url(&code("old00001")).await.unwrap().unwrap();
        assert_eq!(cached.created_at, "2024-05-01T08:00:00+00:00");
        assert_eq!(service.today_count().await.unwrap(), 0);
        assert_eq!(service.total_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn today_count_rolls_over_with_the_clock() {
        let service = service();
        service.shorten("https://example.com/a").await.unwrap();
        assert_eq!(service.today_count().await.unwrap(), 1);

        service.clock.advance(SignedDuration::from_hours(24));
        assert_eq!(service.today_count().await.unwrap(), 0);
        assert_eq!(service.total_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn single_symbol_alphabet_exhausts_the_namespace() {
        let generator =
            RandomGenerator::new(RandomGeneratorSettings::builder().length(1).alphabet("z").build())
                .unwrap();
        let service = service_with(
            ProbeRepository::default(),
            FlakyCache::default(),
            generator,
            CachePolicy::default(),
        );

        assert_eq!(service.shorten("https://1.example").await.unwrap().as_str(), "z");

        let err = service.shorten("https://2.example").await.unwrap_err();
        assert!(matches!(err, ShortenerError::NamespaceExhausted { attempts: 16 }));
        assert_eq!(service.repository.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(
            service.resolve(&code("z")).await.unwrap().as_deref(),
            Some("https://1.example")
        );
    }

    #[tokio::test]
    async fn durable_conflict_is_treated_as_a_collision() {
        let repository = ProbeRepository::default();
        repository
            .inner
            .insert(&code("dup00000"), &row("https://first.example", "2024-05-01T08:00:00Z"))
            .await
            .unwrap();
        let service = service_with(
            repository,
            FlakyCache::default(),
            Scripted::new(&["dup00000", "new00000"]),
            CachePolicy::default(),
        );

        let c = service.shorten("https://second.example").await.unwrap();
        assert_eq!(c.as_str(), "new00000");

        let original = service.repository.lookup(&code("dup00000")).await.unwrap().unwrap();
        assert_eq!(original.url, "https://first.example");
        assert!(!service.cache.exists(&code("dup00000")).await.unwrap());
    }

    #[tokio::test]
    async fn reserved_codes_are_never_minted() {
        let service = ShortenerService::with_clock(
            ProbeRepository::default(),
            FlakyCache::default(),
            Scripted::new(&["stats", "new00000"]),
            clock(),
            ShortenerConfig::builder()
                .reserved_codes(vec!["stats".to_string()])
                .build(),
        );

        let c = service.shorten("https://example.com").await.unwrap();
        assert_eq!(c.as_str(), "new00000");
        assert_eq!(service.repository.inserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn durable_failure_caches_nothing() {
        let service = service_with(
            ProbeRepository::down(),
            FlakyCache::default(),
            RandomGenerator::default(),
            CachePolicy::default(),
        );

        let err = service.shorten("https://example.com").await.unwrap_err();
        assert!(matches!(err, ShortenerError::Storage(StorageError::Unavailable(_))));
        assert_eq!(service.total_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn cache_failure_after_insert_keeps_the_durable_row() {
        let cache = FlakyCache {
            fail_writes: true,
            ..FlakyCache::default()
        };
        let service = service_with(
            ProbeRepository::default(),
            cache,
            Scripted::new(&["kept0000"]),
            CachePolicy::default(),
        );

        let err = service.shorten("https://example.com").await.unwrap_err();
        assert!(matches!(err, ShortenerError::Cache(CacheError::Timeout(_))));

        let durable = service.repository.lookup(&code("kept0000")).await.unwrap();
        assert_eq!(durable.map(|r| r.url).as_deref(), Some("https://example.com"));
    }

    #[tokio::test]
    async fn failed_repair_still_returns_the_url() {
        let repository = ProbeRepository::default();
        repository
            .inner
            .insert(&code("old00001"), &row("https://old.example", "2024-05-01T08:00:00Z"))
            .await
            .unwrap();
        let cache = FlakyCache {
            fail_writes: true,
            ..FlakyCache::default()
        };
        let service = service_with(repository, cache, RandomGenerator::default(), CachePolicy::default());

        let url = service.resolve(&code("old00001")).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://old.example"));
        assert!(!service.cache.exists(&code("old00001")).await.unwrap());
    }

    #[tokio::test]
    async fn durable_lookup_failure_is_surfaced() {
        let service = service_with(
            ProbeRepository::down(),
            FlakyCache::default(),
            RandomGenerator::default(),
            CachePolicy::default(),
        );

        let err = service.resolve(&code("abc12345")).await.unwrap_err();
        assert!(matches!(err, ShortenerError::Storage(_)));
    }

    #[tokio::test]
    async fn undecodable_cache_entry_falls_back_to_the_durable_store() {
        let repository = ProbeRepository::default();
        repository
            .inner
            .insert(&code("abc12345"), &row("https://example.com", "2024-05-01T08:00:00Z"))
            .await
            .unwrap();
        let cache = FlakyCache {
            get_error: Some(CacheError::InvalidData("not json".into())),
            ..FlakyCache::default()
        };
        let service = service_with(repository, cache, RandomGenerator::default(), CachePolicy::default());

        let url = service.resolve(&code("abc12345")).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://example.com"));
        assert_eq!(service.repository.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreachable_cache_falls_back_to_the_durable_store() {
        for get_error in [
            CacheError::Unavailable("connection refused".into()),
            CacheError::Timeout("read timed out".into()),
        ] {
            let repository = ProbeRepository::default();
            repository
                .inner
                .insert(&code("abc12345"), &row("https://example.com", "2024-05-01T08:00:00Z"))
                .await
                .unwrap();
            let cache = FlakyCache {
                get_error: Some(get_error),
                ..FlakyCache::default()
            };
            let service =
                service_with(repository, cache, RandomGenerator::default(), CachePolicy::default());

            let url = service.resolve(&code("abc12345")).await.unwrap();
            assert_eq!(url.as_deref(), Some("https://example.com"));
            assert_eq!(service.repository.lookups.load(Ordering::SeqCst), 1);
            assert_eq!(service.resolve(&code("missing0")).await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn concurrent_shortens_never_share_a_code() {
        let service = Arc::new(service());
        let mut handles = vec![];

        for i in 0..64 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service.shorten(&format!("https://{i}.example")).await.unwrap()
            }));
        }

        let mut codes = HashSet::new();
        for handle in handles {
            assert!(codes.insert(handle.await.unwrap()));
        }
        assert_eq!(codes.len(), 64);
        assert_eq!(service.total_count().await.unwrap(), 64);
    }

    #[tokio::test]
    async fn create_resolve_evict_resolve_scenario() {
        let service = service();

        let c1 = service.shorten("https://example.com/a").await.unwrap();
        assert_eq!(c1.as_str().len(), 8);
        assert_eq!(
            service.resolve(&c1).await.unwrap().as_deref(),
            Some("https://example.com/a")
        );
        assert!(service.total_count().await.unwrap() >= 1);

        service.cache.del(&c1).await.unwrap();
        assert_eq!(
            service.resolve(&c1).await.unwrap().as_deref(),
            Some("https://example.com/a")
        );
        assert!(service.total_count().await.unwrap() >= 1);

        assert_eq!(service.resolve(&code("doesnotexist")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn close_releases_backends() {
        let service = service();
        service.close().await;
    }
}
