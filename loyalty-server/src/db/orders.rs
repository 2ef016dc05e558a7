//! `orders` table
//!
//! One row per order number. Accrual orders carry `bonuses_withdrawn = 0`;
//! withdrawal orders carry the spent amount and are never polled.

use shared::OrderStatus;
use sqlx::SqliteExecutor;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub number: String,
    pub owner: String,
    pub status: String,
    pub accrual: i64,
    pub bonuses_withdrawn: i64,
    pub uploaded_at: i64,
}

/// Unresolved accrual order selected for reconciliation
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingRow {
    pub number: String,
    pub owner: String,
    pub status: String,
}

pub async fn find_owner<'e, E: SqliteExecutor<'e>>(
    exec: E,
    number: &str,
) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as("SELECT owner FROM orders WHERE number = ?1")
        .bind(number)
        .fetch_optional(exec)
        .await?;
    Ok(row.map(|(owner,)| owner))
}

pub async fn find<'e, E: SqliteExecutor<'e>>(
    exec: E,
    number: &str,
) -> Result<Option<OrderRow>, sqlx::Error> {
    sqlx::query_as(
        "SELECT number, owner, status, accrual, bonuses_withdrawn, uploaded_at
         FROM orders WHERE number = ?1",
    )
    .bind(number)
    .fetch_optional(exec)
    .await
}

/// Insert a NEW accrual order; fails with a unique violation if the number exists
pub async fn insert_accrual<'e, E: SqliteExecutor<'e>>(
    exec: E,
    number: &str,
    owner: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO orders (number, owner, status, accrual, bonuses_withdrawn, uploaded_at)
         VALUES (?1, ?2, 'NEW', 0, 0, ?3)",
    )
    .bind(number)
    .bind(owner)
    .bind(now)
    .execute(exec)
    .await?;
    Ok(())
}

/// Insert a NEW withdrawal order carrying the spent amount
///
/// The accrual queries below all filter on `bonuses_withdrawn = 0`, so
/// this row is never polled, resolved or marked.
pub async fn insert_withdrawal<'e, E: SqliteExecutor<'e>>(
    exec: E,
    number: &str,
    owner: &str,
    sum: i64,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO orders (number, owner, status, accrual, bonuses_withdrawn, uploaded_at)
         VALUES (?1, ?2, 'NEW', 0, ?3, ?4)",
    )
    .bind(number)
    .bind(owner)
    .bind(sum)
    .bind(now)
    .execute(exec)
    .await?;
    Ok(())
}

/// Accrual orders of one owner, oldest first
pub async fn list_accrual<'e, E: SqliteExecutor<'e>>(
    exec: E,
    owner: &str,
) -> Result<Vec<OrderRow>, sqlx::Error> {
    sqlx::query_as(
        "SELECT number, owner, status, accrual, bonuses_withdrawn, uploaded_at
         FROM orders
         WHERE owner = ?1 AND bonuses_withdrawn = 0
         ORDER BY uploaded_at ASC, number ASC",
    )
    .bind(owner)
    .fetch_all(exec)
    .await
}

/// Withdrawal orders of one owner, oldest first
pub async fn list_withdrawals<'e, E: SqliteExecutor<'e>>(
    exec: E,
    owner: &str,
) -> Result<Vec<OrderRow>, sqlx::Error> {
    sqlx::query_as(
        "SELECT number, owner, status, accrual, bonuses_withdrawn, uploaded_at
         FROM orders
         WHERE owner = ?1 AND bonuses_withdrawn != 0
         ORDER BY uploaded_at ASC, number ASC",
    )
    .bind(owner)
    .fetch_all(exec)
    .await
}

/// Up to `limit` unresolved accrual orders, oldest first
pub async fn pending<'e, E: SqliteExecutor<'e>>(
    exec: E,
    limit: i64,
) -> Result<Vec<PendingRow>, sqlx::Error> {
    sqlx::query_as(
        "SELECT number, owner, status
         FROM orders
         WHERE status IN ('NEW', 'PROCESSING') AND bonuses_withdrawn = 0
         ORDER BY uploaded_at ASC, number ASC
         LIMIT ?1",
    )
    .bind(limit)
    .fetch_all(exec)
    .await
}

/// Move an unresolved accrual order to a terminal status
///
/// Returns the owner when the row was updated, `None` when the order is
/// missing, already resolved or a withdrawal.
pub async fn resolve<'e, E: SqliteExecutor<'e>>(
    exec: E,
    number: &str,
    status: OrderStatus,
    accrual: i64,
) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as(
        "UPDATE orders SET status = ?1, accrual = ?2
         WHERE number = ?3 AND status IN ('NEW', 'PROCESSING') AND bonuses_withdrawn = 0
         RETURNING owner",
    )
    .bind(status.as_str())
    .bind(accrual)
    .bind(number)
    .fetch_optional(exec)
    .await?;
    Ok(row.map(|(owner,)| owner))
}

/// NEW → PROCESSING for an accrual order; returns affected rows
pub async fn mark_processing<'e, E: SqliteExecutor<'e>>(
    exec: E,
    number: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET status = 'PROCESSING'
         WHERE number = ?1 AND status = 'NEW' AND bonuses_withdrawn = 0",
    )
    .bind(number)
    .execute(exec)
    .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DbService, is_unique_violation, users};

    async fn seeded() -> DbService {
        let db = DbService::in_memory().await.unwrap();
        users::insert(&db.pool, "alice", "hash", 0).await.unwrap();
        users::insert(&db.pool, "bob", "hash", 0).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_number_is_unique_across_flows() {
        let db = seeded().await;
        insert_accrual(&db.pool, "12345678903", "alice", 1).await.unwrap();

        let err = insert_withdrawal(&db.pool, "12345678903", "bob", 100, 2)
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
        assert_eq!(
            find_owner(&db.pool, "12345678903").await.unwrap().as_deref(),
            Some("alice")
        );
    }

    #[tokio::test]
    async fn test_pending_skips_resolved_and_withdrawals() {
        let db = seeded().await;
        insert_accrual(&db.pool, "A3", "alice", 3).await.unwrap();
        insert_accrual(&db.pool, "A1", "bob", 1).await.unwrap();
        insert_accrual(&db.pool, "A2", "alice", 2).await.unwrap();
        insert_withdrawal(&db.pool, "W1", "alice", 500, 0).await.unwrap();
        resolve(&db.pool, "A2", OrderStatus::Invalid, 0).await.unwrap();
        mark_processing(&db.pool, "A3").await.unwrap();

        let rows = pending(&db.pool, 10).await.unwrap();
        let numbers: Vec<_> = rows.iter().map(|r| r.number.as_str()).collect();
        assert_eq!(numbers, vec!["A1", "A3"]);
        assert_eq!(rows[1].status, "PROCESSING");

        let limited = pending(&db.pool, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].number, "A1");
    }

    #[tokio::test]
    async fn test_resolve_only_once() {
        let db = seeded().await;
        insert_accrual(&db.pool, "A1", "alice", 1).await.unwrap();

        let owner = resolve(&db.pool, "A1", OrderStatus::Processed, 5_000).await.unwrap();
        assert_eq!(owner.as_deref(), Some("alice"));

        let again = resolve(&db.pool, "A1", OrderStatus::Processed, 5_000).await.unwrap();
        assert!(again.is_none());

        let row = find(&db.pool, "A1").await.unwrap().unwrap();
        assert_eq!(row.status, "PROCESSED");
        assert_eq!(row.accrual, 5_000);
    }

    #[tokio::test]
    async fn test_lists_split_by_flow() {
        let db = seeded().await;
        insert_accrual(&db.pool, "A1", "alice", 10).await.unwrap();
        insert_withdrawal(&db.pool, "W1", "alice", 250, 20).await.unwrap();
        insert_accrual(&db.pool, "B1", "bob", 5).await.unwrap();

        let accrual = list_accrual(&db.pool, "alice").await.unwrap();
        assert_eq!(accrual.len(), 1);
        assert_eq!(accrual[0].number, "A1");

        let withdrawals = list_withdrawals(&db.pool, "alice").await.unwrap();
        assert_eq!(withdrawals.len(), 1);
        assert_eq!(withdrawals[0].bonuses_withdrawn, 250);

        // Withdrawals stay NEW and out of the accrual flow
        assert!(resolve(&db.pool, "W1", OrderStatus::Processed, 100).await.unwrap().is_none());
        assert_eq!(mark_processing(&db.pool, "W1").await.unwrap(), 0);
        let row = find(&db.pool, "W1").await.unwrap().unwrap();
        assert_eq!(row.status, "NEW");
        assert_eq!(row.accrual, 0);
    }
}
