//! Prediction component: submit and evaluate exact-score predictions
//!
//! Evaluation pulls actual results from a pluggable [`ResultProvider`];
//! the default implementation reads finished scores off the Match
//! collection the scraper maintains.

use crate::account::{self, AccountError};
use crate::db::{self, Database};
use crate::types::{LeaderboardEntry, Prediction, PredictionStatus, Score};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Points for an exact score match
const POINTS_EXACT: i64 = 10;
/// Points for the correct result direction only
const POINTS_DIRECTION: i64 = 1;
/// Leaderboard size
const LEADERBOARD_LIMIT: i64 = 50;

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("user not found")]
    UserNotFound,
    #[error("matchId, homeScore and awayScore are required")]
    MissingFields,
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<AccountError> for PredictionError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::UserNotFound => PredictionError::UserNotFound,
            AccountError::InsufficientBalance { .. } => {
                // Points never debit, so this arm is unreachable in practice
                PredictionError::Other(anyhow::anyhow!("unexpected balance error"))
            }
            corrupt @ AccountError::CorruptBalance(_) => {
                PredictionError::Other(anyhow::Error::new(corrupt))
            }
            AccountError::Db(e) => PredictionError::Db(e),
        }
    }
}

/// Source of authoritative match results.
///
/// Returns `None` while a match has no final score; such predictions stay
/// Pending until a later evaluation pass.
#[async_trait]
pub trait ResultProvider: Send + Sync {
    async fn actual_result(&self, match_id: &str) -> anyhow::Result<Option<Score>>;
}

/// Default provider: final scores from the stored Match collection
pub struct DbResultProvider {
    db: Arc<Database>,
}

impl DbResultProvider {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ResultProvider for DbResultProvider {
    async fn actual_result(&self, match_id: &str) -> anyhow::Result<Option<Score>> {
        let record = self.db.get_match(match_id).await?;
        Ok(record.and_then(|m| m.final_score()))
    }
}

/// Three-tier scoring rule: exact score, correct direction, or miss
pub fn score_prediction(predicted: Score, actual: Score) -> (PredictionStatus, i64) {
    if predicted == actual {
        (PredictionStatus::Won, POINTS_EXACT)
    } else if predicted.direction() == actual.direction() {
        (PredictionStatus::Partial, POINTS_DIRECTION)
    } else {
        (PredictionStatus::Lost, 0)
    }
}

/// Prediction service over the Prediction rows and user points
pub struct PredictionService {
    db: Arc<Database>,
    provider: Arc<dyn ResultProvider>,
}

impl PredictionService {
    pub fn new(db: Arc<Database>, provider: Arc<dyn ResultProvider>) -> Self {
        Self { db, provider }
    }

    /// Submit a prediction, replacing any earlier one for the same match.
    /// The UNIQUE (user_id, match_id) constraint makes the replace-by-key
    /// safe under concurrent submissions.
    pub async fn submit_prediction(
        &self,
        user_id: i64,
        match_id: &str,
        home_score: i64,
        away_score: i64,
    ) -> Result<Prediction, PredictionError> {
        if match_id.is_empty() {
            return Err(PredictionError::MissingFields);
        }

        let submitted_at = Utc::now();
        let mut tx = self.db.begin().await?;
        db::upsert_prediction(&mut tx, user_id, match_id, home_score, away_score, submitted_at)
            .await?;
        db::bump_prediction_counters(&mut tx, user_id, 1, 0).await?;
        tx.commit().await?;

        self.db
            .get_prediction(user_id, match_id)
            .await?
            .ok_or_else(|| PredictionError::Other(anyhow::anyhow!("prediction vanished after insert")))
    }

    /// Evaluate all Pending predictions for a user against the result
    /// provider. Matches without a final result stay Pending. Points earned
    /// this pass are added to the user's total in one write.
    pub async fn evaluate_predictions(
        &self,
        user_id: i64,
    ) -> Result<(i64, Vec<Prediction>), PredictionError> {
        let pending = self.db.pending_predictions(user_id).await?;

        // Resolve actual results before opening the transaction; provider
        // calls may hit the pool or the network.
        let mut outcomes = Vec::with_capacity(pending.len());
        for prediction in pending {
            let actual = self.provider.actual_result(&prediction.match_id).await?;
            outcomes.push((prediction, actual));
        }

        let mut total_points = 0;
        let mut evaluated = Vec::new();

        let mut tx = self.db.begin().await?;
        for (mut prediction, actual) in outcomes {
            let Some(actual) = actual else {
                continue;
            };

            let (status, points) = score_prediction(prediction.predicted_score(), actual);
            db::set_prediction_result(&mut tx, prediction.id, status, points).await?;

            prediction.status = status;
            prediction.points = points;
            total_points += points;
            evaluated.push(prediction);
        }

        if !evaluated.is_empty() {
            account::add_points(&mut tx, user_id, total_points).await?;
            db::bump_prediction_counters(&mut tx, user_id, 0, evaluated.len() as i64).await?;
        }
        tx.commit().await?;

        info!(
            "Evaluated {} predictions for user {}: {} points",
            evaluated.len(),
            user_id,
            total_points
        );

        Ok((total_points, evaluated))
    }

    /// Top 50 users by points
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, PredictionError> {
        Ok(self.db.leaderboard(LEADERBOARD_LIMIT).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MatchOutcome;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    /// Provider backed by a fixed result table
    struct FixedResultProvider(HashMap<String, Score>);

    #[async_trait]
    impl ResultProvider for FixedResultProvider {
        async fn actual_result(&self, match_id: &str) -> anyhow::Result<Option<Score>> {
            Ok(self.0.get(match_id).copied())
        }
    }

    async fn service_with_user(
        results: &[(&str, Score)],
    ) -> (PredictionService, Arc<Database>, i64) {
        let db = Arc::new(Database::new_in_memory().await.unwrap());
        let user_id = db
            .create_user("carol", "carol@example.com", "hash", "123456", Utc::now(), dec!(1000))
            .await
            .unwrap();
        let table = results
            .iter()
            .map(|(id, score)| (id.to_string(), *score))
            .collect();
        let service = PredictionService::new(db.clone(), Arc::new(FixedResultProvider(table)));
        (service, db, user_id)
    }

    #[test]
    fn test_scoring_tiers() {
        let actual = Score { home: 2, away: 1 };
        assert_eq!(
            score_prediction(Score { home: 2, away: 1 }, actual),
            (PredictionStatus::Won, 10)
        );
        assert_eq!(
            score_prediction(Score { home: 3, away: 0 }, actual),
            (PredictionStatus::Partial, 1)
        );
        assert_eq!(
            score_prediction(Score { home: 0, away: 0 }, actual),
            (PredictionStatus::Lost, 0)
        );
        assert_eq!(actual.direction(), MatchOutcome::Home);
    }

    #[test]
    fn test_scoring_zero_zero_exact() {
        // A 0-0 prediction is a valid exact match, not a missing field
        let actual = Score { home: 0, away: 0 };
        assert_eq!(
            score_prediction(Score { home: 0, away: 0 }, actual),
            (PredictionStatus::Won, 10)
        );
    }

    #[tokio::test]
    async fn test_submit_replaces_by_match() {
        let (service, db, user_id) = service_with_user(&[]).await;

        service.submit_prediction(user_id, "m-1", 1, 0).await.unwrap();
        let second = service.submit_prediction(user_id, "m-1", 2, 2).await.unwrap();

        assert_eq!(second.home_score, 2);
        assert_eq!(second.away_score, 2);
        assert_eq!(second.status, PredictionStatus::Pending);

        // Exactly one row for that match
        let all = db.predictions_for_user(user_id).await.unwrap();
        assert_eq!(all.len(), 1);

        // The submitted counter saw both submissions
        let prefs = db.ensure_preferences(user_id).await.unwrap();
        assert_eq!(prefs.predictions_submitted, 2);
    }

    #[tokio::test]
    async fn test_submit_requires_match_id() {
        let (service, _, user_id) = service_with_user(&[]).await;
        let err = service.submit_prediction(user_id, "", 1, 1).await.unwrap_err();
        assert!(matches!(err, PredictionError::MissingFields));
    }

    #[tokio::test]
    async fn test_evaluate_awards_points_once() {
        let (service, db, user_id) = service_with_user(&[
            ("m-exact", Score { home: 2, away: 1 }),
            ("m-direction", Score { home: 3, away: 0 }),
            ("m-miss", Score { home: 0, away: 2 }),
        ])
        .await;

        service.submit_prediction(user_id, "m-exact", 2, 1).await.unwrap();
        service.submit_prediction(user_id, "m-direction", 1, 0).await.unwrap();
        service.submit_prediction(user_id, "m-miss", 4, 4).await.unwrap();

        let (points, evaluated) = service.evaluate_predictions(user_id).await.unwrap();
        assert_eq!(points, 11);
        assert_eq!(evaluated.len(), 3);

        let user = db.get_user_by_id(user_id).await.unwrap().unwrap();
        assert_eq!(user.points, 11);

        // Second pass: nothing Pending, nothing credited
        let (points, evaluated) = service.evaluate_predictions(user_id).await.unwrap();
        assert_eq!(points, 0);
        assert!(evaluated.is_empty());
        let user = db.get_user_by_id(user_id).await.unwrap().unwrap();
        assert_eq!(user.points, 11);
    }

    #[tokio::test]
    async fn test_evaluate_skips_unfinished_matches() {
        let (service, db, user_id) =
            service_with_user(&[("m-done", Score { home: 1, away: 1 })]).await;

        service.submit_prediction(user_id, "m-done", 1, 1).await.unwrap();
        service.submit_prediction(user_id, "m-later", 2, 0).await.unwrap();

        let (points, evaluated) = service.evaluate_predictions(user_id).await.unwrap();
        assert_eq!(points, 10);
        assert_eq!(evaluated.len(), 1);

        // The unfinished match stays Pending for the next pass
        let pending = db.pending_predictions(user_id).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].match_id, "m-later");
    }

    #[tokio::test]
    async fn test_db_result_provider_reads_finished_scores() {
        let db = Arc::new(Database::new_in_memory().await.unwrap());
        db.upsert_match("m-9", "Leeds", "Everton", None, Some(2), Some(0), true)
            .await
            .unwrap();
        db.upsert_match("m-10", "Spurs", "Wolves", None, Some(1), Some(0), false)
            .await
            .unwrap();

        let provider = DbResultProvider::new(db);
        let done = provider.actual_result("m-9").await.unwrap();
        assert_eq!(done, Some(Score { home: 2, away: 0 }));

        // In-play score is not a final result
        assert_eq!(provider.actual_result("m-10").await.unwrap(), None);
        assert_eq!(provider.actual_result("m-11").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_leaderboard_orders_by_points() {
        let (service, db, user_id) =
            service_with_user(&[("m-1", Score { home: 1, away: 0 })]).await;
        let rival = db
            .create_user("dave", "dave@example.com", "hash", "123456", Utc::now(), dec!(1000))
            .await
            .unwrap();

        service.submit_prediction(user_id, "m-1", 1, 0).await.unwrap();
        service.evaluate_predictions(user_id).await.unwrap();
        let _ = rival;

        let board = service.leaderboard().await.unwrap();
        assert_eq!(board[0].username, "carol");
        assert_eq!(board[0].points, 10);
        assert_eq!(board[1].username, "dave");
    }
}
