//! Core domain types for ScoreHub

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of a football match, from the home side's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchOutcome {
    Home,
    Draw,
    Away,
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchOutcome::Home => write!(f, "HOME"),
            MatchOutcome::Draw => write!(f, "DRAW"),
            MatchOutcome::Away => write!(f, "AWAY"),
        }
    }
}

impl FromStr for MatchOutcome {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HOME" => Ok(MatchOutcome::Home),
            "DRAW" => Ok(MatchOutcome::Draw),
            "AWAY" => Ok(MatchOutcome::Away),
            _ => Err(()),
        }
    }
}

/// Lifecycle of a bet: written once at placement, resolved exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetStatus {
    Pending,
    Won,
    Lost,
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A placed wager against offered odds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub id: i64,
    pub user_id: i64,
    /// Denormalized copy of the owner's username
    pub username: String,
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub competition: String,
    pub match_date: DateTime<Utc>,
    pub stake: Decimal,
    pub odds: Decimal,
    pub selected_outcome: MatchOutcome,
    /// stake × odds, fixed at placement time
    pub potential_winnings: Decimal,
    pub status: BetStatus,
    pub actual_outcome: Option<MatchOutcome>,
    pub placed_at: DateTime<Utc>,
}

impl Bet {
    pub fn is_pending(&self) -> bool {
        self.status == BetStatus::Pending
    }
}

/// Evaluation state of a score prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionStatus {
    Pending,
    Won,
    Partial,
    Lost,
}

impl fmt::Display for PredictionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A user's exact-score prediction for one match
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub id: i64,
    pub user_id: i64,
    pub match_id: String,
    pub home_score: i64,
    pub away_score: i64,
    pub status: PredictionStatus,
    pub points: i64,
    pub submitted_at: DateTime<Utc>,
}

impl Prediction {
    pub fn predicted_score(&self) -> Score {
        Score {
            home: self.home_score,
            away: self.away_score,
        }
    }
}

/// A final (or current) match score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: i64,
    pub away: i64,
}

impl Score {
    /// Result direction implied by this score
    pub fn direction(&self) -> MatchOutcome {
        if self.home > self.away {
            MatchOutcome::Home
        } else if self.home < self.away {
            MatchOutcome::Away
        } else {
            MatchOutcome::Draw
        }
    }
}

/// A scraped in-match event (goal, card, substitution...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEvent {
    pub minute: i64,
    pub player: String,
    pub event_type: String,
}

/// A match known to the system, refreshed by the scraper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub competition: Option<String>,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
    pub finished: bool,
    pub last_updated: DateTime<Utc>,
    pub events: Vec<MatchEvent>,
}

impl MatchRecord {
    /// Whether this record is older than the freshness threshold
    pub fn is_stale(&self, staleness_seconds: i64) -> bool {
        Utc::now() - self.last_updated > Duration::seconds(staleness_seconds)
    }

    /// Final score, if the match has finished with both scores known
    pub fn final_score(&self) -> Option<Score> {
        if !self.finished {
            return None;
        }
        match (self.home_score, self.away_score) {
            (Some(home), Some(away)) => Some(Score { home, away }),
            _ => None,
        }
    }
}

/// Fantasy team embedded in a user's preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FantasyTeam {
    pub name: String,
    pub players: Vec<String>,
    pub points: i64,
}

/// Per-user preferences, created lazily on first read
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub user_id: i64,
    pub favorite_club: Option<String>,
    pub favorite_players: Vec<String>,
    pub fantasy_team: Option<FantasyTeam>,
    /// Count of predictions ever submitted
    pub predictions_submitted: i64,
    /// Count of predictions evaluated so far
    pub predictions_evaluated: i64,
    pub updated_at: DateTime<Utc>,
}

/// One row of the points leaderboard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub points: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_round_trip() {
        for s in ["HOME", "DRAW", "AWAY"] {
            let outcome = MatchOutcome::from_str(s).unwrap();
            assert_eq!(outcome.to_string(), s);
        }
        assert!(MatchOutcome::from_str("UPSET").is_err());
    }

    #[test]
    fn test_score_direction() {
        assert_eq!(Score { home: 2, away: 1 }.direction(), MatchOutcome::Home);
        assert_eq!(Score { home: 0, away: 0 }.direction(), MatchOutcome::Draw);
        assert_eq!(Score { home: 1, away: 3 }.direction(), MatchOutcome::Away);
    }

    #[test]
    fn test_final_score_requires_finished() {
        let mut m = MatchRecord {
            match_id: "m1".to_string(),
            home_team: "Arsenal".to_string(),
            away_team: "Chelsea".to_string(),
            competition: None,
            home_score: Some(2),
            away_score: Some(0),
            finished: false,
            last_updated: Utc::now(),
            events: Vec::new(),
        };
        assert!(m.final_score().is_none());
        m.finished = true;
        assert_eq!(m.final_score(), Some(Score { home: 2, away: 0 }));
    }
}
