//! User preferences and fantasy-team endpoints

use crate::api::routes::{api_error, authenticate, internal_error, ApiError};
use crate::api::server::AppState;
use crate::types::UserPreferences;
use axum::{extract::State, http::StatusCode, Json};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Deserialize;

/// Partial update: absent fields keep their stored value
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreferencesRequest {
    pub favorite_club: Option<String>,
    pub favorite_players: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct FantasyTeamRequest {
    pub name: String,
    pub players: Vec<String>,
}

/// Get the caller's preferences, creating them on first read
pub async fn get_preferences(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<UserPreferences>, ApiError> {
    let user_id = authenticate(&state, &auth)?;

    let prefs = state
        .db
        .ensure_preferences(user_id)
        .await
        .map_err(internal_error)?;

    Ok(Json(prefs))
}

/// Update favorite club and/or players
pub async fn update_preferences(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(req): Json<UpdatePreferencesRequest>,
) -> Result<Json<UserPreferences>, ApiError> {
    let user_id = authenticate(&state, &auth)?;

    let prefs = state
        .db
        .update_favorites(
            user_id,
            req.favorite_club.as_deref(),
            req.favorite_players.as_deref(),
        )
        .await
        .map_err(internal_error)?;

    Ok(Json(prefs))
}

/// Replace the caller's fantasy team
pub async fn set_fantasy_team(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(req): Json<FantasyTeamRequest>,
) -> Result<Json<UserPreferences>, ApiError> {
    let user_id = authenticate(&state, &auth)?;

    if req.name.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Fantasy team name is required",
        ));
    }

    let prefs = state
        .db
        .set_fantasy_team(user_id, req.name.trim(), &req.players)
        .await
        .map_err(internal_error)?;

    Ok(Json(prefs))
}
