use crate::error::{AppError, Result};
use crate::model::{ShortenRequest, ShortenResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use shortlane_core::ShortCode;
use shortlane_shortener::Shortener;

pub async fn shorten_handler(
    State(state): State<AppState>,
    request: std::result::Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<Json<ShortenResponse>> {
    let Json(request) = request?;
    let code = state.shortener.shorten(&request.url).await?;

    Ok(Json(ShortenResponse {
        short_url: code.to_url(state.base_url()),
    }))
}

/// Answers with `302 Found` and the stored URL in `Location`.
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Response> {
    let code = ShortCode::new(code).map_err(|e| AppError::BadRequest(e.to_string()))?;

    match state.shortener.resolve(&code).await? {
        Some(url) => Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response()),
        None => Err(AppError::NotFound(format!("short code not found: {code}"))),
    }
}
