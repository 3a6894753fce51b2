use async_trait::async_trait;
use redis::AsyncCommands;
use shortlane_core::{CacheError, CachedRecord, ScanPage, ShortCode, UrlCache};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Type alias for cache results.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Key prefix used when none is configured.
pub const DEFAULT_KEY_PREFIX: &str = "sl:url:";

/// A Redis-based implementation of [`UrlCache`].
///
/// Records are stored as JSON strings under `{prefix}{code}` with a
/// per-key expiry (`SET .. EX`). Scans only visit keys under the prefix, so
/// the database can be shared with other tenants.
#[derive(Debug, Clone)]
pub struct RedisUrlCache {
    conn: redis::aio::MultiplexedConnection,
    keys: KeySpace,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() {
        CacheError::Timeout(message)
    } else if err.is_io_error() || err.is_connection_refusal() {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

impl RedisUrlCache {
    /// Creates a new Redis URL cache using [`DEFAULT_KEY_PREFIX`].
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self::with_prefix(conn, DEFAULT_KEY_PREFIX)
    }

    /// Creates a new Redis URL cache with a custom key prefix.
    ///
    /// # Arguments
    ///
    /// * `conn` - A multiplexed Redis connection
    /// * `key_prefix` - Custom prefix for cache keys (e.g., "myapp:url:")
    pub fn with_prefix(
        conn: redis::aio::MultiplexedConnection,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            keys: KeySpace::new(key_prefix),
        }
    }

    /// Opens a multiplexed connection and checks it with `PING`.
    pub async fn connect(redis_url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| CacheError::Initialization(format!("invalid Redis url: {e}")))?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| map_redis_error("failed to connect to Redis", e))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("Redis did not answer PING", e))?;

        let cache = Self::with_prefix(conn, key_prefix);
        info!(key_prefix = %cache.keys.prefix, "Connected to Redis cache");
        Ok(cache)
    }

    /// Returns the key prefix in use.
    pub fn key_prefix(&self) -> &str {
        &self.keys.prefix
    }

    fn decode(code: &ShortCode, key: &str, raw: &str) -> Result<CachedRecord> {
        serde_json::from_str::<CachedRecord>(raw).map_err(|e| {
            warn!(code = %code, error = %e, "Failed to deserialize cached record");
            CacheError::InvalidData(format!("invalid cached value for key '{key}': {e}"))
        })
    }
}

#[async_trait]
impl UrlCache for RedisUrlCache {
    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        let key = self.keys.key(code);
        trace!(code = %code, "Probing Redis cache");

        let mut conn = self.conn.clone();
        conn.exists::<_, bool>(&key).await.map_err(|e| {
            warn!(code = %code, error = %e, "Redis error on exists");
            map_redis_error("failed to probe key in Redis", e)
        })
    }

    async fn get_url(&self, code: &ShortCode) -> Result<Option<CachedRecord>> {
        let key = self.keys.key(code);
        trace!(code = %code, "Fetching URL record from Redis cache");

        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(cached)) => {
                debug!(code = %code, "Cache hit in Redis");
                Self::decode(code, &key, &cached).map(Some)
            }
            Ok(None) => {
                trace!(code = %code, "Cache miss in Redis");
                Ok(None)
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Redis error on get");
                Err(map_redis_error("failed to fetch value from Redis", e))
            }
        }
    }

    async fn get_many(&self, codes: &[ShortCode]) -> Result<Vec<Option<CachedRecord>>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = codes.iter().map(|code| self.keys.key(code)).collect();
        trace!(count = keys.len(), "Fetching URL records from Redis cache");

        let mut conn = self.conn.clone();
        let values: Vec<Option<String>> = conn.mget(&keys).await.map_err(|e| {
            warn!(error = %e, "Redis error on mget");
            map_redis_error("failed to fetch values from Redis", e)
        })?;

        Ok(codes
            .iter()
            .zip(keys.iter())
            .zip(values)
            .map(|((code, key), value)| {
                value.and_then(|raw| Self::decode(code, key, &raw).ok())
            })
            .collect())
    }

    /// Sub-second TTLs are rounded up to one second, the smallest `EX` Redis accepts.
    async fn set_url(&self, code: &ShortCode, record: &CachedRecord, ttl: Duration) -> Result<()> {
        let key = self.keys.key(code);
        trace!(code = %code, ttl_secs = ttl.as_secs(), "Storing URL record in Redis cache");

        let json = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                warn!(code = %code, error = %e, "Failed to serialize record for caching");
                return Err(CacheError::Serialization(format!(
                    "failed to serialize cache value: {e}"
                )));
            }
        };

        let mut conn = self.conn.clone();
        match conn
            .set_ex::<_, _, ()>(&key, json, ttl.as_secs().max(1))
            .await
        {
            Ok(()) => {
                debug!(code = %code, "Cached record in Redis");
                Ok(())
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Failed to cache record in Redis");
                Err(map_redis_error("failed to write value to Redis", e))
            }
        }
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        let key = self.keys.key(code);
        trace!(code = %code, "Removing URL record from Redis cache");

        let mut conn = self.conn.clone();
        match conn.del::<_, ()>(&key).await {
            Ok(()) => {
                debug!(code = %code, "Removed record from Redis cache");
                Ok(())
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Failed to remove record from Redis cache");
                Err(map_redis_error("failed to delete value from Redis", e))
            }
        }
    }

    async fn scan(&self, cursor: u64, count: usize) -> Result<ScanPage> {
        trace!(cursor, count, "Scanning Redis keys");

        let mut conn = self.conn.clone();
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(self.keys.pattern())
            .arg("COUNT")
            .arg(count.max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(cursor, error = %e, "Redis error on scan");
                map_redis_error("failed to scan keys in Redis", e)
            })?;

        Ok(ScanPage {
            cursor: next,
            codes: keys.iter().filter_map(|key| self.keys.code(key)).collect(),
        })
    }
}

/// Maps short codes to Redis keys and back.
#[derive(Debug, Clone)]
struct KeySpace {
    prefix: String,
}

impl KeySpace {
    fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn key(&self, code: &ShortCode) -> String {
        format!("{}{}", self.prefix, code.as_str())
    }

    fn code(&self, key: &str) -> Option<ShortCode> {
        key.strip_prefix(self.prefix.as_str())
            .filter(|rest| !rest.is_empty())
            .map(ShortCode::new_unchecked)
    }

    /// `SCAN MATCH` pattern for every key under the prefix.
    fn pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.prefix.len() + 1);
        for c in self.prefix.chars() {
            if matches!(c, '*' | '?' | '[' | ']' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('*');
        pattern
    }
}

// Tests that need a live server are in tests/redis_cache_integration.rs.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_round_trips_through_prefix() {
        let keys = KeySpace::new(DEFAULT_KEY_PREFIX);
        let code = ShortCode::new_unchecked("aB3dE6gH");

        let key = keys.key(&code);
        assert_eq!(key, "sl:url:aB3dE6gH");
        assert_eq!(keys.code(&key), Some(code));
    }

    #[test]
    fn foreign_keys_are_ignored() {
        let keys = KeySpace::new("sl:url:");
        assert_eq!(keys.code("other:abc"), None);
        assert_eq!(keys.code("sl:url:"), None);
    }

    #[test]
    fn empty_prefix_matches_everything() {
        let keys = KeySpace::new("");
        assert_eq!(keys.pattern(), "*");
        assert_eq!(keys.code("abc"), Some(ShortCode::new_unchecked("abc")));
    }

    #[test]
    fn pattern_escapes_glob_characters() {
        let keys = KeySpace::new("app[1]*:");
        assert_eq!(keys.pattern(), "app\\[1\\]\\*:*");
    }
}
