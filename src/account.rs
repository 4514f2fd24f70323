//! Virtual-currency account operations
//!
//! The only code allowed to mutate `users.balance` or `users.points`. Every
//! operation takes a caller-owned transaction, so a debit and the write that
//! motivated it commit together or not at all.

use rust_decimal::Decimal;
use sqlx::SqliteConnection;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("user not found")]
    UserNotFound,
    #[error("insufficient balance: have {balance}, need {required}")]
    InsufficientBalance { balance: Decimal, required: Decimal },
    #[error("stored balance for user {0} is not a valid decimal")]
    CorruptBalance(i64),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Debit a user's balance, re-checking sufficient funds against the row as
/// read inside this transaction. Returns the new balance.
pub async fn debit(
    conn: &mut SqliteConnection,
    user_id: i64,
    amount: Decimal,
) -> Result<Decimal, AccountError> {
    let balance = balance_of(conn, user_id).await?;
    if balance < amount {
        return Err(AccountError::InsufficientBalance {
            balance,
            required: amount,
        });
    }

    let new_balance = balance - amount;
    write_balance(conn, user_id, new_balance).await?;
    Ok(new_balance)
}

/// Credit a user's balance. Returns the new balance.
pub async fn credit(
    conn: &mut SqliteConnection,
    user_id: i64,
    amount: Decimal,
) -> Result<Decimal, AccountError> {
    let balance = balance_of(conn, user_id).await?;
    let new_balance = balance + amount;
    write_balance(conn, user_id, new_balance).await?;
    Ok(new_balance)
}

/// Add prediction points to a user's running total
pub async fn add_points(
    conn: &mut SqliteConnection,
    user_id: i64,
    points: i64,
) -> Result<(), AccountError> {
    let result = sqlx::query("UPDATE users SET points = points + ? WHERE id = ?")
        .bind(points)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AccountError::UserNotFound);
    }
    Ok(())
}

async fn balance_of(conn: &mut SqliteConnection, user_id: i64) -> Result<Decimal, AccountError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT balance FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some((balance,)) => {
            Decimal::from_str(&balance).map_err(|_| AccountError::CorruptBalance(user_id))
        }
        None => Err(AccountError::UserNotFound),
    }
}

async fn write_balance(
    conn: &mut SqliteConnection,
    user_id: i64,
    balance: Decimal,
) -> Result<(), AccountError> {
    sqlx::query("UPDATE users SET balance = ? WHERE id = ?")
        .bind(balance.to_string())
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    async fn seeded_user(db: &Database) -> i64 {
        db.create_user(
            "alice",
            "alice@example.com",
            "hash",
            "123456",
            Utc::now(),
            dec!(1000),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_debit_and_credit() {
        let db = Database::new_in_memory().await.unwrap();
        let user_id = seeded_user(&db).await;

        let mut tx = db.begin().await.unwrap();
        let after_debit = debit(&mut tx, user_id, dec!(250)).await.unwrap();
        assert_eq!(after_debit, dec!(750));
        let after_credit = credit(&mut tx, user_id, dec!(50)).await.unwrap();
        assert_eq!(after_credit, dec!(800));
        tx.commit().await.unwrap();

        let user = db.get_user_by_id(user_id).await.unwrap().unwrap();
        assert_eq!(user.balance, dec!(800));
    }

    #[tokio::test]
    async fn test_debit_insufficient_rolls_back() {
        let db = Database::new_in_memory().await.unwrap();
        let user_id = seeded_user(&db).await;

        let mut tx = db.begin().await.unwrap();
        let err = debit(&mut tx, user_id, dec!(1500)).await.unwrap_err();
        assert!(matches!(err, AccountError::InsufficientBalance { .. }));
        drop(tx);

        let user = db.get_user_by_id(user_id).await.unwrap().unwrap();
        assert_eq!(user.balance, dec!(1000));
    }

    #[tokio::test]
    async fn test_corrupt_balance_is_an_error_not_zero() {
        let db = Database::new_in_memory().await.unwrap();
        let user_id = seeded_user(&db).await;

        let mut tx = db.begin().await.unwrap();
        sqlx::query("UPDATE users SET balance = 'not-a-number' WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .unwrap();

        // An unreadable balance must surface, not be treated as 0
        let err = debit(&mut tx, user_id, dec!(1)).await.unwrap_err();
        assert!(matches!(err, AccountError::CorruptBalance(id) if id == user_id));
        let err = credit(&mut tx, user_id, dec!(1)).await.unwrap_err();
        assert!(matches!(err, AccountError::CorruptBalance(_)));
    }

    #[tokio::test]
    async fn test_debit_unknown_user() {
        let db = Database::new_in_memory().await.unwrap();
        let mut tx = db.begin().await.unwrap();
        let err = debit(&mut tx, 999, dec!(1)).await.unwrap_err();
        assert!(matches!(err, AccountError::UserNotFound));
    }
}
