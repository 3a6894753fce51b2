use jiff::Zoned;
use serde::{Deserialize, Serialize};

/// Layout of [`CachedRecord::created_at`]. The date comes first so the
/// stored string can be compared against a day string directly.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Layout of the day strings produced by [`day_of`].
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// The value stored under a short code in the cache tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRecord {
    /// The original URL that was shortened.
    pub url: String,
    /// When this record was written, rendered with [`CREATED_AT_FORMAT`].
    pub created_at: String,
}

impl CachedRecord {
    pub fn new(url: impl Into<String>, created_at: &Zoned) -> Self {
        Self {
            url: url.into(),
            created_at: created_at.strftime(CREATED_AT_FORMAT).to_string(),
        }
    }

    /// Whether the stored `created_at` falls on `day` (a [`DAY_FORMAT`] string).
    ///
    /// Compares the stored text, not a parsed instant: the day is whatever
    /// calendar date the writer's clock showed.
    pub fn was_created_on(&self, day: &str) -> bool {
        self.created_at.split('T').next() == Some(day)
    }
}

/// Renders the calendar day of `now` as used by [`CachedRecord::was_created_on`].
pub fn day_of(now: &Zoned) -> String {
    now.strftime(DAY_FORMAT).to_string()
}
