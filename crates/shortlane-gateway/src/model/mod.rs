mod stats;
mod url;

pub use stats::{StatsResponse, TodayStatsResponse};
pub use url::{ShortenRequest, ShortenResponse};

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
