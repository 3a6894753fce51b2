//! Core types and traits for the Shortlane URL shortener.
//!
//! This crate holds the data model shared by every other crate and the two
//! adapter contracts the engine consumes: [`UrlCache`] for the time-bounded
//! cache tier and [`Repository`] for the authoritative durable store.

pub mod cache;
pub mod clock;
pub mod error;
pub mod record;
pub mod repository;
pub mod shortcode;

pub use cache::{ScanPage, UrlCache};
pub use clock::{Clock, SystemClock};

#[cfg(any(test, feature = "test-util"))]
pub use clock::ManualClock;
pub use error::{CacheError, CoreError, StorageError};
pub use record::CachedRecord;
pub use repository::{ReadRepository, Repository, UrlRow};
pub use shortcode::ShortCode;
