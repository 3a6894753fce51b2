use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub shortened_url_count: u64,
}

#[derive(Debug, Serialize)]
pub struct TodayStatsResponse {
    pub shortened_url_count_today: u64,
}
