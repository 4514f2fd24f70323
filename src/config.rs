//! Configuration management for the ScoreHub server

use anyhow::Result;
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

/// Server configuration loaded from environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database
    pub database_path: String,

    /// Port the HTTP server binds to
    pub port: u16,

    /// Base URL of the external football-data API
    pub football_api_url: String,

    /// Interval between scrape cycles in seconds
    pub scrape_interval_seconds: u64,

    /// Age in seconds after which a stored match is considered stale
    pub match_staleness_seconds: i64,

    /// Secret used to sign and verify bearer tokens
    pub jwt_secret: String,

    /// Virtual-currency balance granted to new accounts
    pub starting_balance: Decimal,

    /// Minutes before a registration OTP expires
    pub otp_expiry_minutes: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let database_path = env::var("DATABASE_PATH")
            .unwrap_or_else(|_| "scorehub.db".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let football_api_url = env::var("FOOTBALL_API_URL")
            .unwrap_or_else(|_| "https://api.football-data.example".to_string());

        let scrape_interval_seconds = env::var("SCRAPE_INTERVAL_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        let match_staleness_seconds = env::var("MATCH_STALENESS_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using development default");
            "scorehub-dev-secret".to_string()
        });

        let starting_balance = env::var("STARTING_BALANCE")
            .ok()
            .and_then(|v| Decimal::from_str(&v).ok())
            .unwrap_or_else(|| Decimal::from(1000));

        let otp_expiry_minutes = env::var("OTP_EXPIRY_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        if starting_balance < Decimal::ZERO {
            anyhow::bail!("STARTING_BALANCE must not be negative");
        }

        Ok(Self {
            database_path,
            port,
            football_api_url,
            scrape_interval_seconds,
            match_staleness_seconds,
            jwt_secret,
            starting_balance,
            otp_expiry_minutes,
        })
    }
}

#[cfg(test)]
impl Config {
    /// Fixed configuration for unit tests
    pub fn for_tests() -> Self {
        Self {
            database_path: "sqlite::memory:".to_string(),
            port: 0,
            football_api_url: "http://localhost:0".to_string(),
            scrape_interval_seconds: 300,
            match_staleness_seconds: 300,
            jwt_secret: "test-secret".to_string(),
            starting_balance: Decimal::from(1000),
            otp_expiry_minutes: 10,
        }
    }
}
