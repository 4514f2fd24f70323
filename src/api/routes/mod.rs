//! API route handlers

pub mod auth;
pub mod bets;
pub mod matches;
pub mod predictions;
pub mod preferences;

use crate::api::server::AppState;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use serde::Serialize;

/// Error body shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            message: message.into(),
        }),
    )
}

/// 500 with a generic body; the real cause goes to the log only
pub fn internal_error<E: std::fmt::Display>(e: E) -> ApiError {
    tracing::error!("Internal error: {}", e);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// Validate the bearer token and return the caller's user id
pub fn authenticate(state: &AppState, auth: &Authorization<Bearer>) -> Result<i64, ApiError> {
    crate::auth::verify_token(auth.token(), &state.config.jwt_secret)
        .map_err(|_| api_error(StatusCode::UNAUTHORIZED, "Invalid or expired token"))
}
