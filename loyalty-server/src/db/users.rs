//! `users` table: accounts and their running balance
//!
//! Amounts are hundredths of a point.

use sqlx::SqliteExecutor;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub login: String,
    pub password_hash: String,
    pub balance: i64,
    pub withdrawn: i64,
    pub created_at: i64,
}

pub async fn insert<'e, E: SqliteExecutor<'e>>(
    exec: E,
    login: &str,
    password_hash: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (login, password_hash, balance, withdrawn, created_at)
         VALUES (?1, ?2, 0, 0, ?3)",
    )
    .bind(login)
    .bind(password_hash)
    .bind(now)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn find_by_login<'e, E: SqliteExecutor<'e>>(
    exec: E,
    login: &str,
) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as(
        "SELECT login, password_hash, balance, withdrawn, created_at FROM users WHERE login = ?1",
    )
    .bind(login)
    .fetch_optional(exec)
    .await
}

/// `(balance, withdrawn)` for one user
pub async fn balance<'e, E: SqliteExecutor<'e>>(
    exec: E,
    login: &str,
) -> Result<Option<(i64, i64)>, sqlx::Error> {
    sqlx::query_as("SELECT balance, withdrawn FROM users WHERE login = ?1")
        .bind(login)
        .fetch_optional(exec)
        .await
}

/// Add `amount` to the balance; returns affected rows (0 = no such user)
pub async fn credit<'e, E: SqliteExecutor<'e>>(
    exec: E,
    login: &str,
    amount: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET balance = balance + ?1 WHERE login = ?2")
        .bind(amount)
        .bind(login)
        .execute(exec)
        .await?;
    Ok(result.rows_affected())
}

/// Check-and-decrement in one statement
///
/// Returns affected rows: 0 when the user is missing or `balance < amount`.
pub async fn debit<'e, E: SqliteExecutor<'e>>(
    exec: E,
    login: &str,
    amount: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users
         SET balance = balance - ?1, withdrawn = withdrawn + ?1
         WHERE login = ?2 AND balance >= ?1",
    )
    .bind(amount)
    .bind(login)
    .execute(exec)
    .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    #[tokio::test]
    async fn test_insert_and_find() {
        let db = DbService::in_memory().await.unwrap();
        insert(&db.pool, "alice", "hash", 1000).await.unwrap();

        let user = find_by_login(&db.pool, "alice").await.unwrap().unwrap();
        assert_eq!(user.login, "alice");
        assert_eq!(user.balance, 0);
        assert_eq!(user.withdrawn, 0);
        assert_eq!(user.created_at, 1000);

        assert!(find_by_login(&db.pool, "bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_debit_is_conditional() {
        let db = DbService::in_memory().await.unwrap();
        insert(&db.pool, "alice", "hash", 0).await.unwrap();
        assert_eq!(credit(&db.pool, "alice", 10_000).await.unwrap(), 1);

        assert_eq!(debit(&db.pool, "alice", 10_001).await.unwrap(), 0);
        assert_eq!(debit(&db.pool, "alice", 4_000).await.unwrap(), 1);
        assert_eq!(balance(&db.pool, "alice").await.unwrap(), Some((6_000, 4_000)));

        assert_eq!(debit(&db.pool, "alice", 6_000).await.unwrap(), 1);
        assert_eq!(balance(&db.pool, "alice").await.unwrap(), Some((0, 10_000)));
    }

    #[tokio::test]
    async fn test_missing_user_affects_nothing() {
        let db = DbService::in_memory().await.unwrap();
        assert_eq!(credit(&db.pool, "ghost", 100).await.unwrap(), 0);
        assert_eq!(debit(&db.pool, "ghost", 0).await.unwrap(), 0);
        assert!(balance(&db.pool, "ghost").await.unwrap().is_none());
    }
}
