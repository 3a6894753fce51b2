//! Durable store implementations for Shortlane.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;
pub use shortlane_core::{ReadRepository, Repository, StorageError, UrlRow};
