//! Cache tier implementations for Shortlane.
//!
//! Both implementations honour a per-entry TTL and support full key scans,
//! which the statistics endpoints rely on.

pub mod moka;
pub mod redis;

pub use self::moka::MokaUrlCache;
pub use self::redis::RedisUrlCache;
pub use shortlane_core::{CacheError, ScanPage, UrlCache};
