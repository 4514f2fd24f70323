//! Axum server setup and configuration

use crate::api::routes;
use crate::predictions::DbResultProvider;
use crate::wagering::RandomOutcomeDecider;
use crate::{Config, Database, PredictionService, Scraper, WageringService};
use anyhow::Result;
use axum::{
    http::{header, Method},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
    pub wagering: Arc<WageringService>,
    pub predictions: Arc<PredictionService>,
    pub scraper: Arc<Scraper>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let db = Arc::new(Database::new(&config.database_path).await?);
        let scraper = Arc::new(Scraper::new(config.clone()));
        let wagering = Arc::new(WageringService::new(
            db.clone(),
            Arc::new(RandomOutcomeDecider),
        ));
        let predictions = Arc::new(PredictionService::new(
            db.clone(),
            Arc::new(DbResultProvider::new(db.clone())),
        ));

        Ok(Self {
            db,
            config: Arc::new(config),
            wagering,
            predictions,
            scraper,
        })
    }
}

/// Create the Axum application with all routes
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        // Account routes
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/verify", post(routes::auth::verify))
        .route("/auth/login", post(routes::auth::login))
        // Wagering routes
        .route("/bet/place", post(routes::bets::place_bet))
        .route("/bet/history", get(routes::bets::betting_history))
        .route("/bet/balance", get(routes::bets::balance))
        .route("/bet/resolve", post(routes::bets::resolve_bets))
        // Prediction routes
        .route("/user/predict", post(routes::predictions::submit_prediction))
        .route("/user/evaluate", post(routes::predictions::evaluate_predictions))
        .route("/user/leaderboard", get(routes::predictions::leaderboard))
        // Preference routes
        .route("/user/preferences", get(routes::preferences::get_preferences))
        .route("/user/preferences", put(routes::preferences::update_preferences))
        .route("/user/preferences/fantasy", put(routes::preferences::set_fantasy_team))
        // Public match data
        .route("/matches/:match_id", get(routes::matches::get_match))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn test_state() -> AppState {
        let config = Config::for_tests();
        let db = Arc::new(Database::new_in_memory().await.unwrap());
        let scraper = Arc::new(Scraper::new(config.clone()));
        let wagering = Arc::new(WageringService::new(
            db.clone(),
            Arc::new(RandomOutcomeDecider),
        ));
        let predictions = Arc::new(PredictionService::new(
            db.clone(),
            Arc::new(DbResultProvider::new(db.clone())),
        ));

        AppState {
            db,
            config: Arc::new(config),
            wagering,
            predictions,
            scraper,
        }
    }

    async fn test_app() -> Router {
        create_app(test_state().await)
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = test_app().await;
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bad_token_is_unauthorized() {
        let app = test_app().await;
        let response = app
            .oneshot(
                Request::get("/bet/balance")
                    .header("Authorization", "Bearer not-a-real-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_history_is_bare_array() {
        let state = test_state().await;
        let user_id = state
            .db
            .create_user(
                "frank",
                "frank@example.com",
                "hash",
                "123456",
                chrono::Utc::now(),
                rust_decimal::Decimal::from(1000),
            )
            .await
            .unwrap();
        let token = crate::auth::issue_token(user_id, &state.config.jwt_secret).unwrap();

        let app = create_app(state);
        let response = app
            .oneshot(
                Request::get("/bet/history")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body.is_array());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(
                Request::post("/auth/register")
                    .header("Content-Type", "application/json")
                    .body(Body::from(
                        r#"{"username":"eve","email":"eve@example.com","password":"hunter2"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        // Unverified accounts cannot sign in
        let response = app
            .oneshot(
                Request::post("/auth/login")
                    .header("Content-Type", "application/json")
                    .body(Body::from(
                        r#"{"email":"eve@example.com","password":"hunter2"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
