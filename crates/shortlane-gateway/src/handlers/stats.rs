use crate::error::Result;
use crate::model::{StatsResponse, TodayStatsResponse};
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use shortlane_shortener::UrlStats;

pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let count = state.stats.total_count().await?;
    Ok(Json(StatsResponse {
        shortened_url_count: count,
    }))
}

pub async fn today_stats_handler(
    State(state): State<AppState>,
) -> Result<Json<TodayStatsResponse>> {
    let count = state.stats.today_count().await?;
    Ok(Json(TodayStatsResponse {
        shortened_url_count_today: count,
    }))
}
