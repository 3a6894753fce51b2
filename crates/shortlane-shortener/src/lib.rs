//! The code-minting and dual-tier consistency engine.
//!
//! [`ShortenerService`] mints collision-checked codes, persists them to the
//! durable store, mirrors them into the cache, and resolves codes cache-first
//! with read-through repair. [`StatsAggregator`] derives counts from the
//! cache alone.

pub mod error;
pub mod mint;
pub mod policy;
pub mod service;
pub mod shortener;
pub mod stats;

pub use error::{Result, ShortenerError};
pub use mint::CodeMinter;
pub use policy::{CachePolicy, ShortenerConfig};
pub use service::ShortenerService;
pub use shortener::{Shortener, UrlStats};
pub use stats::StatsAggregator;
