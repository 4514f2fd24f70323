//! Wagering component: place, resolve, history, and balance operations
//!
//! Balance mutations go through [`crate::account`] inside a single
//! transaction per operation, so a debit never lands without its bet row
//! and a batch resolution credits the balance exactly once.

use crate::account::{self, AccountError};
use crate::db::{self, Database, NewBet};
use crate::types::{Bet, BetStatus, MatchOutcome};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// How many bets the history endpoint returns
const HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Error)]
pub enum WageringError {
    #[error("user not found")]
    UserNotFound,
    #[error("bet amount must be a positive number")]
    InvalidAmount,
    #[error("insufficient balance: have {balance}, need {required}")]
    InsufficientBalance { balance: Decimal, required: Decimal },
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<AccountError> for WageringError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::UserNotFound => WageringError::UserNotFound,
            AccountError::InsufficientBalance { balance, required } => {
                WageringError::InsufficientBalance { balance, required }
            }
            corrupt @ AccountError::CorruptBalance(_) => {
                WageringError::Other(anyhow::Error::new(corrupt))
            }
            AccountError::Db(e) => WageringError::Db(e),
        }
    }
}

/// Decides the actual outcome a pending bet is settled against.
///
/// The default is a uniform coin flip between HOME and AWAY, which keeps
/// settlement a simulation; wire in a real result source by swapping the
/// implementation.
pub trait OutcomeDecider: Send + Sync {
    fn decide(&self, bet: &Bet) -> MatchOutcome;
}

/// Simulation decider: HOME or AWAY with equal probability
pub struct RandomOutcomeDecider;

impl OutcomeDecider for RandomOutcomeDecider {
    fn decide(&self, _bet: &Bet) -> MatchOutcome {
        if rand::random::<bool>() {
            MatchOutcome::Home
        } else {
            MatchOutcome::Away
        }
    }
}

/// Request to place a bet, already parsed and typed
#[derive(Debug, Clone)]
pub struct PlaceBet {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub competition: String,
    pub match_date: chrono::DateTime<Utc>,
    pub stake: Decimal,
    pub odds: Decimal,
    pub selected_outcome: MatchOutcome,
}

/// Wagering service over the Bet and User collections
pub struct WageringService {
    db: Arc<Database>,
    decider: Arc<dyn OutcomeDecider>,
}

impl WageringService {
    pub fn new(db: Arc<Database>, decider: Arc<dyn OutcomeDecider>) -> Self {
        Self { db, decider }
    }

    /// Debit the stake and create a Pending bet, atomically.
    /// Returns the bet and the new balance.
    pub async fn place_bet(
        &self,
        user_id: i64,
        req: PlaceBet,
    ) -> Result<(Bet, Decimal), WageringError> {
        if req.stake <= Decimal::ZERO {
            return Err(WageringError::InvalidAmount);
        }

        let placed_at = Utc::now();
        let potential_winnings = req.stake * req.odds;

        let mut tx = self.db.begin().await?;

        let username = db::username_by_id(&mut tx, user_id)
            .await?
            .ok_or(WageringError::UserNotFound)?;

        let new_balance = account::debit(&mut tx, user_id, req.stake).await?;

        let new_bet = NewBet {
            match_id: req.match_id,
            home_team: req.home_team,
            away_team: req.away_team,
            competition: req.competition,
            match_date: req.match_date,
            stake: req.stake,
            odds: req.odds,
            selected_outcome: req.selected_outcome,
        };
        let bet_id =
            db::insert_bet(&mut tx, user_id, &username, &new_bet, potential_winnings, placed_at)
                .await?;

        tx.commit().await?;

        info!(
            "Bet placed: user={} match={} stake={} odds={} outcome={}",
            username, new_bet.match_id, new_bet.stake, new_bet.odds, new_bet.selected_outcome
        );

        let bet = Bet {
            id: bet_id,
            user_id,
            username,
            match_id: new_bet.match_id,
            home_team: new_bet.home_team,
            away_team: new_bet.away_team,
            competition: new_bet.competition,
            match_date: new_bet.match_date,
            stake: new_bet.stake,
            odds: new_bet.odds,
            selected_outcome: new_bet.selected_outcome,
            potential_winnings,
            status: BetStatus::Pending,
            actual_outcome: None,
            placed_at,
        };

        Ok((bet, new_balance))
    }

    /// Resolve every Pending bet for a user: decide each outcome, mark
    /// Won or Lost, accumulate winnings, and credit the balance once.
    /// Already-resolved bets are never touched, so calling this twice in
    /// a row cannot double-credit.
    pub async fn resolve_bets(&self, username: &str) -> Result<(Vec<Bet>, Decimal), WageringError> {
        let mut tx = self.db.begin().await?;

        let user_id = db::user_id_by_username(&mut tx, username)
            .await?
            .ok_or(WageringError::UserNotFound)?;

        let pending = db::pending_bets(&mut tx, user_id).await?;

        let mut total_winnings = Decimal::ZERO;
        let mut resolved = Vec::with_capacity(pending.len());

        for mut bet in pending {
            let actual = self.decider.decide(&bet);
            let won = actual == bet.selected_outcome;

            bet.status = if won { BetStatus::Won } else { BetStatus::Lost };
            bet.actual_outcome = Some(actual);
            db::mark_bet_resolved(&mut tx, bet.id, bet.status, actual).await?;

            if won {
                total_winnings += bet.potential_winnings;
            }
            resolved.push(bet);
        }

        // Single credit after the loop, inside the same transaction
        let new_balance = account::credit(&mut tx, user_id, total_winnings).await?;

        tx.commit().await?;

        info!(
            "Resolved {} bets for {}: winnings={} balance={}",
            resolved.len(),
            username,
            total_winnings,
            new_balance
        );

        Ok((resolved, new_balance))
    }

    /// The 50 most recently placed bets, newest first. Unknown users get
    /// an empty list; there is deliberately no existence check here.
    pub async fn betting_history(&self, user_id: i64) -> Result<Vec<Bet>, WageringError> {
        Ok(self.db.betting_history(user_id, HISTORY_LIMIT).await?)
    }

    /// Current virtual-currency balance
    pub async fn balance(&self, user_id: i64) -> Result<Decimal, WageringError> {
        let user = self
            .db
            .get_user_by_id(user_id)
            .await?
            .ok_or(WageringError::UserNotFound)?;
        Ok(user.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// Deterministic decider for settlement tests
    struct FixedOutcomeDecider(MatchOutcome);

    impl OutcomeDecider for FixedOutcomeDecider {
        fn decide(&self, _bet: &Bet) -> MatchOutcome {
            self.0
        }
    }

    async fn service_with_user(
        balance: Decimal,
        decider: MatchOutcome,
    ) -> (WageringService, i64) {
        let db = Arc::new(Database::new_in_memory().await.unwrap());
        let user_id = db
            .create_user("bob", "bob@example.com", "hash", "123456", Utc::now(), balance)
            .await
            .unwrap();
        let service = WageringService::new(db, Arc::new(FixedOutcomeDecider(decider)));
        (service, user_id)
    }

    fn sample_bet(stake: Decimal, odds: Decimal, outcome: MatchOutcome) -> PlaceBet {
        PlaceBet {
            match_id: "m-100".to_string(),
            home_team: "Arsenal".to_string(),
            away_team: "Chelsea".to_string(),
            competition: "Premier League".to_string(),
            match_date: Utc::now(),
            stake,
            odds,
            selected_outcome: outcome,
        }
    }

    #[tokio::test]
    async fn test_place_bet_debits_and_records() {
        let (service, user_id) = service_with_user(dec!(1000), MatchOutcome::Home).await;

        let (bet, new_balance) = service
            .place_bet(user_id, sample_bet(dec!(200), dec!(2.5), MatchOutcome::Home))
            .await
            .unwrap();

        assert_eq!(new_balance, dec!(800));
        assert_eq!(bet.potential_winnings, dec!(500));
        assert_eq!(bet.status, BetStatus::Pending);
        assert_eq!(bet.username, "bob");
    }

    #[tokio::test]
    async fn test_place_bet_rejects_non_positive_amount() {
        let (service, user_id) = service_with_user(dec!(1000), MatchOutcome::Home).await;

        for stake in [dec!(0), dec!(-5)] {
            let err = service
                .place_bet(user_id, sample_bet(stake, dec!(2), MatchOutcome::Home))
                .await
                .unwrap_err();
            assert!(matches!(err, WageringError::InvalidAmount));
        }

        assert_eq!(service.balance(user_id).await.unwrap(), dec!(1000));
    }

    #[tokio::test]
    async fn test_place_bet_rejects_insufficient_balance() {
        let (service, user_id) = service_with_user(dec!(100), MatchOutcome::Home).await;

        let err = service
            .place_bet(user_id, sample_bet(dec!(150), dec!(2), MatchOutcome::Home))
            .await
            .unwrap_err();
        assert!(matches!(err, WageringError::InsufficientBalance { .. }));

        // Balance untouched: the debit never committed
        assert_eq!(service.balance(user_id).await.unwrap(), dec!(100));
    }

    #[tokio::test]
    async fn test_combined_stakes_cannot_overspend() {
        // Two placements whose combined stake exceeds the balance. The
        // funds check runs against the row as read inside each placement's
        // own transaction, and SQLite serializes the writers, so the
        // second placement sees the already-debited balance and is
        // rejected instead of driving it negative.
        let (service, user_id) = service_with_user(dec!(300), MatchOutcome::Home).await;

        service
            .place_bet(user_id, sample_bet(dec!(200), dec!(2), MatchOutcome::Home))
            .await
            .unwrap();

        let err = service
            .place_bet(user_id, sample_bet(dec!(200), dec!(2), MatchOutcome::Home))
            .await
            .unwrap_err();
        assert!(matches!(err, WageringError::InsufficientBalance { .. }));

        // Exactly one stake was debited; the balance never went negative
        let balance = service.balance(user_id).await.unwrap();
        assert_eq!(balance, dec!(100));

        let history = service.betting_history(user_id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_place_bet_unknown_user() {
        let (service, _) = service_with_user(dec!(1000), MatchOutcome::Home).await;
        let err = service
            .place_bet(999, sample_bet(dec!(10), dec!(2), MatchOutcome::Home))
            .await
            .unwrap_err();
        assert!(matches!(err, WageringError::UserNotFound));
    }

    #[tokio::test]
    async fn test_resolve_credits_only_winners() {
        // Decider always answers HOME: the HOME bet wins, the AWAY bet loses
        let (service, user_id) = service_with_user(dec!(1000), MatchOutcome::Home).await;

        service
            .place_bet(user_id, sample_bet(dec!(200), dec!(2.5), MatchOutcome::Home))
            .await
            .unwrap();
        service
            .place_bet(user_id, sample_bet(dec!(100), dec!(3), MatchOutcome::Away))
            .await
            .unwrap();
        assert_eq!(service.balance(user_id).await.unwrap(), dec!(700));

        let (resolved, new_balance) = service.resolve_bets("bob").await.unwrap();

        assert_eq!(resolved.len(), 2);
        assert!(resolved.iter().all(|b| !b.is_pending()));
        let won: Vec<_> = resolved.iter().filter(|b| b.status == BetStatus::Won).collect();
        assert_eq!(won.len(), 1);
        assert_eq!(won[0].selected_outcome, MatchOutcome::Home);
        // 700 + 200 * 2.5 from the winning bet only
        assert_eq!(new_balance, dec!(1200));
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let (service, user_id) = service_with_user(dec!(1000), MatchOutcome::Home).await;
        service
            .place_bet(user_id, sample_bet(dec!(100), dec!(2), MatchOutcome::Home))
            .await
            .unwrap();

        let (_, balance_after_first) = service.resolve_bets("bob").await.unwrap();
        assert_eq!(balance_after_first, dec!(1100));

        // Second pass finds no Pending bets and credits nothing
        let (resolved, balance_after_second) = service.resolve_bets("bob").await.unwrap();
        assert!(resolved.is_empty());
        assert_eq!(balance_after_second, dec!(1100));
    }

    #[tokio::test]
    async fn test_resolve_unknown_username() {
        let (service, _) = service_with_user(dec!(1000), MatchOutcome::Home).await;
        let err = service.resolve_bets("nobody").await.unwrap_err();
        assert!(matches!(err, WageringError::UserNotFound));
    }

    #[tokio::test]
    async fn test_history_newest_first_and_capped() {
        let (service, user_id) = service_with_user(dec!(1000), MatchOutcome::Home).await;

        for i in 0..3 {
            let mut bet = sample_bet(dec!(10), dec!(2), MatchOutcome::Home);
            bet.match_id = format!("m-{}", i);
            service.place_bet(user_id, bet).await.unwrap();
        }

        let history = service.betting_history(user_id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].match_id, "m-2");

        // Unknown users get an empty list, not an error
        let empty = service.betting_history(999).await.unwrap();
        assert!(empty.is_empty());
    }
}
