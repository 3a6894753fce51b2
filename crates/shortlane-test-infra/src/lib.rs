//! Disposable backing services for integration tests.
//!
//! Each fixture starts a container on a random host port and stops it when
//! dropped.

pub mod error;
pub mod postgres;
pub mod redis;

pub use error::{Result, TestInfraError};
