//! SQLite database for users, bets, matches, and preferences

use crate::types::{
    Bet, BetStatus, FantasyTeam, LeaderboardEntry, MatchEvent, MatchOutcome, MatchRecord,
    Prediction, PredictionStatus, UserPreferences,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqliteConnection, Transaction};
use std::str::FromStr;
use tracing::info;

/// Stored user record, including auth columns
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_verified: bool,
    pub otp: Option<String>,
    pub otp_expires: Option<DateTime<Utc>>,
    pub balance: Decimal,
    pub points: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert a new bet row
#[derive(Debug, Clone)]
pub struct NewBet {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub competition: String,
    pub match_date: DateTime<Utc>,
    pub stake: Decimal,
    pub odds: Decimal,
    pub selected_outcome: MatchOutcome,
}

/// Database connection pool
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn new(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(path)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        let db = Self { pool };
        db.initialize().await?;

        Ok(db)
    }

    /// In-memory database for tests. A single connection keeps every query
    /// on the same memory store.
    pub async fn new_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        let db = Self { pool };
        db.initialize().await?;

        Ok(db)
    }

    /// Begin a transaction. Multi-row mutations (debit + bet insert,
    /// resolve + credit) run inside one of these so balance and bet state
    /// change together or not at all.
    pub async fn begin(&self) -> Result<Transaction<'_, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Initialize database schema
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                is_verified INTEGER NOT NULL DEFAULT 0,
                otp TEXT,
                otp_expires TEXT,
                reset_token TEXT,
                reset_token_expires TEXT,
                balance TEXT NOT NULL,
                points INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                username TEXT NOT NULL,
                match_id TEXT NOT NULL,
                home_team TEXT NOT NULL,
                away_team TEXT NOT NULL,
                competition TEXT NOT NULL,
                match_date TEXT NOT NULL,
                stake TEXT NOT NULL,
                odds TEXT NOT NULL,
                selected_outcome TEXT NOT NULL,
                potential_winnings TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'Pending',
                actual_outcome TEXT,
                placed_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS matches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                match_id TEXT NOT NULL UNIQUE,
                home_team TEXT NOT NULL,
                away_team TEXT NOT NULL,
                competition TEXT,
                home_score INTEGER,
                away_score INTEGER,
                finished INTEGER NOT NULL DEFAULT 0,
                last_updated TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS match_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                match_id TEXT NOT NULL,
                minute INTEGER NOT NULL,
                player TEXT NOT NULL,
                event_type TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // One prediction per (user, match); submissions replace by key
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                match_id TEXT NOT NULL,
                home_score INTEGER NOT NULL,
                away_score INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'Pending',
                points INTEGER NOT NULL DEFAULT 0,
                submitted_at TEXT NOT NULL,
                UNIQUE (user_id, match_id),
                FOREIGN KEY (user_id) REFERENCES users(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_preferences (
                user_id INTEGER PRIMARY KEY,
                favorite_club TEXT,
                favorite_players TEXT NOT NULL DEFAULT '[]',
                fantasy_name TEXT,
                fantasy_players TEXT NOT NULL DEFAULT '[]',
                fantasy_points INTEGER NOT NULL DEFAULT 0,
                predictions_submitted INTEGER NOT NULL DEFAULT 0,
                predictions_evaluated INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Indexes for the hot lookups
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_bets_user_status ON bets(user_id, status)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_bets_user_placed ON bets(user_id, placed_at)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_match ON match_events(match_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_points ON users(points)")
            .execute(&self.pool)
            .await?;

        info!("Database initialized");
        Ok(())
    }

    // ==================== USERS ====================

    /// Create a new, unverified user with the starting balance
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        otp: &str,
        otp_expires: DateTime<Utc>,
        starting_balance: Decimal,
    ) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, otp, otp_expires, balance, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(email.to_lowercase())
        .bind(password_hash)
        .bind(otp)
        .bind(otp_expires.to_rfc3339())
        .bind(starting_balance.to_string())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<StoredUser>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<StoredUser>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<StoredUser>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    /// Mark a user verified and clear their OTP state
    pub async fn mark_verified(&self, user_id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE users SET is_verified = 1, otp = NULL, otp_expires = NULL WHERE id = ?",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Top users by points, descending
    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT username, points FROM users ORDER BY points DESC, username ASC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(username, points)| LeaderboardEntry { username, points })
            .collect())
    }

    // ==================== BETS ====================

    /// Most recently placed bets for a user, newest first
    pub async fn betting_history(&self, user_id: i64, limit: i64) -> Result<Vec<Bet>> {
        let rows = sqlx::query(
            "SELECT * FROM bets WHERE user_id = ? ORDER BY placed_at DESC, id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_bet).collect()
    }

    // ==================== MATCHES ====================

    /// Get a match with its scraped events
    pub async fn get_match(&self, match_id: &str) -> Result<Option<MatchRecord>> {
        let row = sqlx::query("SELECT * FROM matches WHERE match_id = ?")
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let event_rows = sqlx::query(
            "SELECT minute, player, event_type FROM match_events WHERE match_id = ? ORDER BY minute ASC, id ASC",
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await?;

        let events = event_rows
            .iter()
            .map(|r| MatchEvent {
                minute: r.get("minute"),
                player: r.get("player"),
                event_type: r.get("event_type"),
            })
            .collect();

        let last_updated_str: String = row.get("last_updated");
        Ok(Some(MatchRecord {
            match_id: row.get("match_id"),
            home_team: row.get("home_team"),
            away_team: row.get("away_team"),
            competition: row.get("competition"),
            home_score: row.get("home_score"),
            away_score: row.get("away_score"),
            finished: row.get("finished"),
            last_updated: DateTime::parse_from_rfc3339(&last_updated_str)?.with_timezone(&Utc),
            events,
        }))
    }

    /// Create or overwrite a match record, refreshing its timestamp
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_match(
        &self,
        match_id: &str,
        home_team: &str,
        away_team: &str,
        competition: Option<&str>,
        home_score: Option<i64>,
        away_score: Option<i64>,
        finished: bool,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO matches (match_id, home_team, away_team, competition, home_score, away_score, finished, last_updated)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (match_id) DO UPDATE SET
                home_team = excluded.home_team,
                away_team = excluded.away_team,
                competition = excluded.competition,
                home_score = excluded.home_score,
                away_score = excluded.away_score,
                finished = excluded.finished,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(match_id)
        .bind(home_team)
        .bind(away_team)
        .bind(competition)
        .bind(home_score)
        .bind(away_score)
        .bind(finished)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Replace the scraped event list for a match wholesale
    pub async fn replace_match_events(&self, match_id: &str, events: &[MatchEvent]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM match_events WHERE match_id = ?")
            .bind(match_id)
            .execute(&mut *tx)
            .await?;

        for event in events {
            sqlx::query(
                "INSERT INTO match_events (match_id, minute, player, event_type) VALUES (?, ?, ?, ?)",
            )
            .bind(match_id)
            .bind(event.minute)
            .bind(&event.player)
            .bind(&event.event_type)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // ==================== PREDICTIONS ====================

    pub async fn pending_predictions(&self, user_id: i64) -> Result<Vec<Prediction>> {
        let rows = sqlx::query(
            "SELECT * FROM predictions WHERE user_id = ? AND status = 'Pending' ORDER BY submitted_at ASC, id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_prediction).collect()
    }

    pub async fn predictions_for_user(&self, user_id: i64) -> Result<Vec<Prediction>> {
        let rows = sqlx::query(
            "SELECT * FROM predictions WHERE user_id = ? ORDER BY submitted_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_prediction).collect()
    }

    pub async fn get_prediction(&self, user_id: i64, match_id: &str) -> Result<Option<Prediction>> {
        let row = sqlx::query("SELECT * FROM predictions WHERE user_id = ? AND match_id = ?")
            .bind(user_id)
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_prediction).transpose()
    }

    // ==================== PREFERENCES ====================

    /// Get preferences, creating the row on first read
    pub async fn ensure_preferences(&self, user_id: i64) -> Result<UserPreferences> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO user_preferences (user_id, updated_at) VALUES (?, ?) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT * FROM user_preferences WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        row_to_preferences(&row)
    }

    /// Partial update of favorite club / players
    pub async fn update_favorites(
        &self,
        user_id: i64,
        favorite_club: Option<&str>,
        favorite_players: Option<&[String]>,
    ) -> Result<UserPreferences> {
        // Make sure the row exists before the partial update
        self.ensure_preferences(user_id).await?;

        let now = Utc::now().to_rfc3339();
        if let Some(club) = favorite_club {
            sqlx::query(
                "UPDATE user_preferences SET favorite_club = ?, updated_at = ? WHERE user_id = ?",
            )
            .bind(club)
            .bind(&now)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        }
        if let Some(players) = favorite_players {
            let players_json = serde_json::to_string(players)?;
            sqlx::query(
                "UPDATE user_preferences SET favorite_players = ?, updated_at = ? WHERE user_id = ?",
            )
            .bind(players_json)
            .bind(&now)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        }

        self.ensure_preferences(user_id).await
    }

    /// Replace the fantasy team
    pub async fn set_fantasy_team(
        &self,
        user_id: i64,
        name: &str,
        players: &[String],
    ) -> Result<UserPreferences> {
        self.ensure_preferences(user_id).await?;

        let players_json = serde_json::to_string(players)?;
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE user_preferences SET fantasy_name = ?, fantasy_players = ?, updated_at = ? WHERE user_id = ?",
        )
        .bind(name)
        .bind(players_json)
        .bind(now)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        self.ensure_preferences(user_id).await
    }
}

// ==================== TRANSACTION-SCOPED OPERATIONS ====================
//
// These run inside a caller-owned transaction so a multi-row mutation
// commits or rolls back as one unit.

/// Look up a user's denormalized fields inside a transaction
pub async fn username_by_id(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as("SELECT username FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|(username,)| username))
}

pub async fn user_id_by_username(
    conn: &mut SqliteConnection,
    username: &str,
) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|(id,)| id))
}

/// Insert a Pending bet row; returns its id
pub async fn insert_bet(
    conn: &mut SqliteConnection,
    user_id: i64,
    username: &str,
    new: &NewBet,
    potential_winnings: Decimal,
    placed_at: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO bets (user_id, username, match_id, home_team, away_team, competition,
                          match_date, stake, odds, selected_outcome, potential_winnings, status, placed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'Pending', ?)
        "#,
    )
    .bind(user_id)
    .bind(username)
    .bind(&new.match_id)
    .bind(&new.home_team)
    .bind(&new.away_team)
    .bind(&new.competition)
    .bind(new.match_date.to_rfc3339())
    .bind(new.stake.to_string())
    .bind(new.odds.to_string())
    .bind(new.selected_outcome.to_string())
    .bind(potential_winnings.to_string())
    .bind(placed_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Pending bets for a user, read inside the resolving transaction
pub async fn pending_bets(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<Bet>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT * FROM bets WHERE user_id = ? AND status = 'Pending' ORDER BY placed_at ASC, id ASC",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|r| row_to_bet(r).map_err(|e| sqlx::Error::Decode(e.into())))
        .collect()
}

/// Write a bet's one-and-only resolution
pub async fn mark_bet_resolved(
    conn: &mut SqliteConnection,
    bet_id: i64,
    status: BetStatus,
    actual_outcome: MatchOutcome,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE bets SET status = ?, actual_outcome = ? WHERE id = ? AND status = 'Pending'")
        .bind(format!("{:?}", status))
        .bind(actual_outcome.to_string())
        .bind(bet_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Replace-by-key prediction write: the second submission's scores win
pub async fn upsert_prediction(
    conn: &mut SqliteConnection,
    user_id: i64,
    match_id: &str,
    home_score: i64,
    away_score: i64,
    submitted_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO predictions (user_id, match_id, home_score, away_score, status, points, submitted_at)
        VALUES (?, ?, ?, ?, 'Pending', 0, ?)
        ON CONFLICT (user_id, match_id) DO UPDATE SET
            home_score = excluded.home_score,
            away_score = excluded.away_score,
            status = 'Pending',
            points = 0,
            submitted_at = excluded.submitted_at
        "#,
    )
    .bind(user_id)
    .bind(match_id)
    .bind(home_score)
    .bind(away_score)
    .bind(submitted_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn set_prediction_result(
    conn: &mut SqliteConnection,
    prediction_id: i64,
    status: PredictionStatus,
    points: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE predictions SET status = ?, points = ? WHERE id = ?")
        .bind(format!("{:?}", status))
        .bind(points)
        .bind(prediction_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Bump the aggregate prediction counters on the preferences row
pub async fn bump_prediction_counters(
    conn: &mut SqliteConnection,
    user_id: i64,
    submitted: i64,
    evaluated: i64,
) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO user_preferences (user_id, updated_at) VALUES (?, ?) ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        UPDATE user_preferences
        SET predictions_submitted = predictions_submitted + ?,
            predictions_evaluated = predictions_evaluated + ?,
            updated_at = ?
        WHERE user_id = ?
        "#,
    )
    .bind(submitted)
    .bind(evaluated)
    .bind(&now)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// ==================== ROW MAPPING ====================

fn row_to_user(row: &SqliteRow) -> Result<StoredUser> {
    let balance_str: String = row.get("balance");
    let created_at_str: String = row.get("created_at");
    let otp_expires: Option<String> = row.get("otp_expires");

    Ok(StoredUser {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        is_verified: row.get("is_verified"),
        otp: row.get("otp"),
        otp_expires: otp_expires
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|d| d.with_timezone(&Utc)),
        balance: Decimal::from_str(&balance_str)
            .map_err(|e| anyhow::anyhow!("corrupt balance column: {}", e))?,
        points: row.get("points"),
        created_at: DateTime::parse_from_rfc3339(&created_at_str)?.with_timezone(&Utc),
    })
}

fn row_to_bet(row: &SqliteRow) -> Result<Bet> {
    let status_str: String = row.get("status");
    let status = match status_str.as_str() {
        "Won" => BetStatus::Won,
        "Lost" => BetStatus::Lost,
        _ => BetStatus::Pending,
    };

    let selected_str: String = row.get("selected_outcome");
    let selected_outcome = MatchOutcome::from_str(&selected_str)
        .map_err(|_| anyhow::anyhow!("unknown outcome: {}", selected_str))?;

    let actual_str: Option<String> = row.get("actual_outcome");
    let actual_outcome = actual_str.and_then(|s| MatchOutcome::from_str(&s).ok());

    let stake_str: String = row.get("stake");
    let odds_str: String = row.get("odds");
    let potential_str: String = row.get("potential_winnings");
    let match_date_str: String = row.get("match_date");
    let placed_at_str: String = row.get("placed_at");

    Ok(Bet {
        id: row.get("id"),
        user_id: row.get("user_id"),
        username: row.get("username"),
        match_id: row.get("match_id"),
        home_team: row.get("home_team"),
        away_team: row.get("away_team"),
        competition: row.get("competition"),
        match_date: DateTime::parse_from_rfc3339(&match_date_str)?.with_timezone(&Utc),
        stake: Decimal::from_str(&stake_str)?,
        odds: Decimal::from_str(&odds_str)?,
        selected_outcome,
        potential_winnings: Decimal::from_str(&potential_str)?,
        status,
        actual_outcome,
        placed_at: DateTime::parse_from_rfc3339(&placed_at_str)?.with_timezone(&Utc),
    })
}

fn row_to_prediction(row: &SqliteRow) -> Result<Prediction> {
    let status_str: String = row.get("status");
    let status = match status_str.as_str() {
        "Won" => PredictionStatus::Won,
        "Partial" => PredictionStatus::Partial,
        "Lost" => PredictionStatus::Lost,
        _ => PredictionStatus::Pending,
    };

    let submitted_at_str: String = row.get("submitted_at");
    Ok(Prediction {
        id: row.get("id"),
        user_id: row.get("user_id"),
        match_id: row.get("match_id"),
        home_score: row.get("home_score"),
        away_score: row.get("away_score"),
        status,
        points: row.get("points"),
        submitted_at: DateTime::parse_from_rfc3339(&submitted_at_str)?.with_timezone(&Utc),
    })
}

fn row_to_preferences(row: &SqliteRow) -> Result<UserPreferences> {
    let favorite_players_json: String = row.get("favorite_players");
    let fantasy_players_json: String = row.get("fantasy_players");
    let updated_at_str: String = row.get("updated_at");

    let fantasy_name: Option<String> = row.get("fantasy_name");
    let fantasy_team = fantasy_name.map(|name| {
        Ok::<_, serde_json::Error>(FantasyTeam {
            name,
            players: serde_json::from_str(&fantasy_players_json)?,
            points: row.get("fantasy_points"),
        })
    });

    Ok(UserPreferences {
        user_id: row.get("user_id"),
        favorite_club: row.get("favorite_club"),
        favorite_players: serde_json::from_str(&favorite_players_json)?,
        fantasy_team: fantasy_team.transpose()?,
        predictions_submitted: row.get("predictions_submitted"),
        predictions_evaluated: row.get("predictions_evaluated"),
        updated_at: DateTime::parse_from_rfc3339(&updated_at_str)?.with_timezone(&Utc),
    })
}
