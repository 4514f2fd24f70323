//! Prediction endpoints: submit, evaluate, leaderboard

use crate::api::routes::{api_error, authenticate, internal_error, ApiError};
use crate::api::server::AppState;
use crate::predictions::PredictionError;
use crate::types::{LeaderboardEntry, Prediction};
use axum::{extract::State, http::StatusCode, Json};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::{Deserialize, Serialize};

/// Prediction submission. Fields are optional so a missing score can be
/// told apart from a legitimate 0.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    pub match_id: Option<String>,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: Prediction,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    pub points_earned: i64,
    pub predictions: Vec<Prediction>,
}

fn map_prediction_error(err: PredictionError) -> ApiError {
    match err {
        PredictionError::UserNotFound => api_error(StatusCode::NOT_FOUND, "User not found"),
        PredictionError::MissingFields => api_error(
            StatusCode::BAD_REQUEST,
            "matchId, homeScore and awayScore are required",
        ),
        other => internal_error(other),
    }
}

/// Submit (or replace) the caller's prediction for a match
pub async fn submit_prediction(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    let user_id = authenticate(&state, &auth)?;

    let (Some(match_id), Some(home_score), Some(away_score)) =
        (req.match_id, req.home_score, req.away_score)
    else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "matchId, homeScore and awayScore are required",
        ));
    };

    if home_score < 0 || away_score < 0 {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Scores must be non-negative",
        ));
    }

    let prediction = state
        .predictions
        .submit_prediction(user_id, &match_id, home_score, away_score)
        .await
        .map_err(map_prediction_error)?;

    Ok(Json(PredictResponse { prediction }))
}

/// Evaluate the caller's Pending predictions against known final scores
pub async fn evaluate_predictions(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    let user_id = authenticate(&state, &auth)?;

    let (points_earned, predictions) = state
        .predictions
        .evaluate_predictions(user_id)
        .await
        .map_err(map_prediction_error)?;

    Ok(Json(EvaluateResponse {
        points_earned,
        predictions,
    }))
}

/// Top users by prediction points as a bare array
pub async fn leaderboard(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    authenticate(&state, &auth)?;

    let leaderboard = state
        .predictions
        .leaderboard()
        .await
        .map_err(map_prediction_error)?;

    Ok(Json(leaderboard))
}
