//! HTTP surface of the shortener.

pub mod app;
pub mod error;
pub mod handlers;
pub mod model;
pub mod state;

pub use app::{App, RESERVED_CODES};
pub use state::AppState;
