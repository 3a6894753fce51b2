use std::time::Duration;
use typed_builder::TypedBuilder;

/// TTL for the cache record written when a code is created.
pub const DEFAULT_INITIAL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// TTL for the cache record written by read-through repair.
pub const DEFAULT_REPAIR_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on candidate draws per `shorten` call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

/// How long cache entries live and what a repaired entry records as its
/// creation time.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct CachePolicy {
    #[builder(default = DEFAULT_INITIAL_TTL)]
    pub initial_ttl: Duration,
    #[builder(default = DEFAULT_REPAIR_TTL)]
    pub repair_ttl: Duration,
    /// When `true`, a repaired cache record is stamped with the repair time,
    /// so it counts towards "today" in the stats. When `false`, it carries
    /// the durable row's creation time.
    #[builder(default = true)]
    pub repair_refreshes_created_at: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct ShortenerConfig {
    #[builder(default)]
    pub policy: CachePolicy,
    /// Shared budget for cache collisions and durable conflicts. Zero is
    /// treated as one.
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
    /// Codes the minter never hands out.
    #[builder(default, setter(into))]
    pub reserved_codes: Vec<String>,
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let policy = CachePolicy::default();
        assert_eq!(policy.initial_ttl, Duration::from_secs(604_800));
        assert_eq!(policy.repair_ttl, Duration::from_secs(86_400));
        assert!(policy.repair_refreshes_created_at);

        let config = ShortenerConfig::default();
        assert_eq!(config.max_attempts, 16);
        assert!(config.reserved_codes.is_empty());
        assert_eq!(config.policy, policy);
    }

    #[test]
    fn builder_overrides() {
        let policy = CachePolicy::builder()
            .repair_ttl(Duration::from_secs(60))
            .repair_refreshes_created_at(false)
            .build();
        assert_eq!(policy.initial_ttl, DEFAULT_INITIAL_TTL);
        assert_eq!(policy.repair_ttl, Duration::from_secs(60));
        assert!(!policy.repair_refreshes_created_at);
    }
}
