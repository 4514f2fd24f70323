//! Registration, verification, and sign-in endpoints

use crate::api::routes::{api_error, internal_error, ApiError};
use crate::api::server::AppState;
use crate::auth;
use axum::{extract::State, http::StatusCode, Json};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Registration response. The OTP is returned in the body; a mail
/// integration would deliver it out of band instead.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: i64,
    pub username: String,
    pub otp: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

/// Create an unverified account with the starting balance
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let username = req.username.trim();
    let email = req.email.trim();

    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "username, email and password are required",
        ));
    }

    let email_taken = state
        .db
        .get_user_by_email(email)
        .await
        .map_err(internal_error)?
        .is_some();
    let username_taken = state
        .db
        .get_user_by_username(username)
        .await
        .map_err(internal_error)?
        .is_some();
    if email_taken || username_taken {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Email or username already registered",
        ));
    }

    let password_hash = auth::hash_password(&req.password).map_err(internal_error)?;
    let otp = auth::generate_otp();
    let otp_expires = Utc::now() + Duration::minutes(state.config.otp_expiry_minutes);

    let id = state
        .db
        .create_user(
            username,
            email,
            &password_hash,
            &otp,
            otp_expires,
            state.config.starting_balance,
        )
        .await
        .map_err(internal_error)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id,
            username: username.to_string(),
            otp,
            message: "Registration successful, verify your account with the OTP".to_string(),
        }),
    ))
}

/// Verify a fresh account against its OTP
pub async fn verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = state
        .db
        .get_user_by_email(&req.email)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Invalid email or OTP"))?;

    if user.is_verified {
        return Ok(Json(MessageResponse {
            message: "Account already verified".to_string(),
        }));
    }

    let otp_matches = user.otp.as_deref() == Some(req.otp.as_str());
    let otp_fresh = user
        .otp_expires
        .map(|expires| expires > Utc::now())
        .unwrap_or(false);
    if !otp_matches || !otp_fresh {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid email or OTP"));
    }

    state
        .db
        .mark_verified(user.id)
        .await
        .map_err(internal_error)?;

    Ok(Json(MessageResponse {
        message: "Account verified".to_string(),
    }))
}

/// Exchange credentials for a bearer token
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .db
        .get_user_by_email(&req.email)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Invalid email or password"))?;

    if !auth::verify_password(&req.password, &user.password_hash) {
        return Err(api_error(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password",
        ));
    }

    if !user.is_verified {
        return Err(api_error(StatusCode::UNAUTHORIZED, "Account not verified"));
    }

    let token = auth::issue_token(user.id, &state.config.jwt_secret).map_err(internal_error)?;

    Ok(Json(LoginResponse {
        token,
        username: user.username,
    }))
}
