//! Wagering endpoints: place, history, balance, resolve

use crate::api::routes::{api_error, authenticate, internal_error, ApiError};
use crate::api::server::AppState;
use crate::types::{Bet, MatchOutcome};
use crate::wagering::{PlaceBet, WageringError};
use axum::{extract::State, http::StatusCode, Json};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Request to place a bet. Amounts arrive as strings to keep decimal
/// precision intact.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBetRequest {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub competition: String,
    pub match_date: String,
    pub bet_amount: String,
    pub odds: String,
    pub selected_outcome: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBetResponse {
    pub bet: Bet,
    pub new_balance: Decimal,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub username: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub resolved_bets: Vec<Bet>,
    pub new_balance: Decimal,
}

fn map_wagering_error(err: WageringError) -> ApiError {
    match err {
        WageringError::UserNotFound => api_error(StatusCode::NOT_FOUND, "User not found"),
        WageringError::InvalidAmount => api_error(
            StatusCode::BAD_REQUEST,
            "Bet amount must be a positive number",
        ),
        WageringError::InsufficientBalance { .. } => {
            api_error(StatusCode::BAD_REQUEST, "Insufficient balance")
        }
        other => internal_error(other),
    }
}

/// Place a bet: debit the stake and record a Pending bet
pub async fn place_bet(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(req): Json<PlaceBetRequest>,
) -> Result<(StatusCode, Json<PlaceBetResponse>), ApiError> {
    let user_id = authenticate(&state, &auth)?;

    let stake = Decimal::from_str(&req.bet_amount)
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid betAmount"))?;
    let odds = Decimal::from_str(&req.odds)
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid odds"))?;
    let selected_outcome = MatchOutcome::from_str(&req.selected_outcome).map_err(|_| {
        api_error(
            StatusCode::BAD_REQUEST,
            "selectedOutcome must be HOME, DRAW or AWAY",
        )
    })?;
    let match_date = DateTime::parse_from_rfc3339(&req.match_date)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid matchDate"))?;

    let (bet, new_balance) = state
        .wagering
        .place_bet(
            user_id,
            PlaceBet {
                match_id: req.match_id,
                home_team: req.home_team,
                away_team: req.away_team,
                competition: req.competition,
                match_date,
                stake,
                odds,
                selected_outcome,
            },
        )
        .await
        .map_err(map_wagering_error)?;

    Ok((
        StatusCode::CREATED,
        Json(PlaceBetResponse { bet, new_balance }),
    ))
}

/// The caller's most recent bets as a bare array, newest first
pub async fn betting_history(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Vec<Bet>>, ApiError> {
    let user_id = authenticate(&state, &auth)?;

    let bets = state
        .wagering
        .betting_history(user_id)
        .await
        .map_err(map_wagering_error)?;

    Ok(Json(bets))
}

/// The caller's current virtual-currency balance
pub async fn balance(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let user_id = authenticate(&state, &auth)?;

    let balance = state
        .wagering
        .balance(user_id)
        .await
        .map_err(map_wagering_error)?;

    Ok(Json(BalanceResponse { balance }))
}

/// Resolve every Pending bet for the named user and credit winnings
pub async fn resolve_bets(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, ApiError> {
    authenticate(&state, &auth)?;

    let (resolved_bets, new_balance) = state
        .wagering
        .resolve_bets(&req.username)
        .await
        .map_err(map_wagering_error)?;

    Ok(Json(ResolveResponse {
        resolved_bets,
        new_balance,
    }))
}
