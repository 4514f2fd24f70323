//! ScoreHub backend library
//!
//! Aggregates football match data from an external provider and lets users
//! place simulated bets and score predictions with virtual currency:
//!
//! 1. **Wagering**: place bets against offered odds, resolve pending bets
//!    through a pluggable outcome decider, track balance and history.
//! 2. **Predictions**: submit exact-score predictions per match, evaluated
//!    against a pluggable result provider with three-tier scoring.
//! 3. **Ingestion**: a periodic scrape loop keeps the match collection fresh.

pub mod account;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod predictions;
pub mod scraper;
pub mod types;
pub mod wagering;

pub use config::Config;
pub use db::Database;
pub use predictions::{DbResultProvider, PredictionService, ResultProvider};
pub use scraper::Scraper;
pub use types::{Bet, BetStatus, MatchOutcome, MatchRecord, Prediction, PredictionStatus};
pub use wagering::{OutcomeDecider, RandomOutcomeDecider, WageringService};
