use crate::error::StorageError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A row in the durable store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRow {
    /// The original URL that was shortened.
    pub url: String,
    /// When the mapping was first persisted.
    pub created_at: Timestamp,
}

/// A read-only view of the durable store.
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Looks up the row for a given short code.
    /// Returns `None` if the code does not exist.
    async fn lookup(&self, code: &ShortCode) -> Result<Option<UrlRow>>;
}

/// The authoritative code to URL mapping.
///
/// The code is a primary key: a stored code never changes its URL.
#[async_trait]
pub trait Repository: ReadRepository {
    /// Inserts a new row. Returns `Err(Conflict)` if the code already exists;
    /// an existing row is never overwritten.
    async fn insert(&self, code: &ShortCode, row: &UrlRow) -> Result<()>;

    /// Releases connections held by the repository.
    async fn close(&self) {}
}
