//! Public match-data endpoint

use crate::api::routes::{api_error, internal_error, ApiError};
use crate::api::server::AppState;
use crate::types::MatchRecord;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::warn;

/// Get a match with its scraped events. A missing or stale record
/// triggers an on-demand refresh from the provider; if that fails we
/// serve whatever is stored.
pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<MatchRecord>, ApiError> {
    let stored = state
        .db
        .get_match(&match_id)
        .await
        .map_err(internal_error)?;

    let needs_refresh = match &stored {
        Some(record) => record.is_stale(state.config.match_staleness_seconds),
        None => true,
    };

    let record = if needs_refresh {
        match state.scraper.refresh_match(&state.db, &match_id).await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!("Failed to refresh match {}: {}", match_id, e);
                stored
            }
        }
    } else {
        stored
    };

    record
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Match not found"))
}
