//! Order registrar
//!
//! Lookup-then-insert for accrual orders. The pre-check only produces the
//! friendly answer; the `orders.number` primary key decides races.

use shared::util::{millis_to_rfc3339, now_millis};
use shared::{OrderStatus, OrderView};

use super::{Ledger, LedgerError, held_by_caller, luhn, money};
use crate::db::{self, orders};

/// Successful registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// New order stored as NEW
    Accepted,
    /// Same owner uploaded it before; nothing changed
    AlreadyOwnedByCaller,
}

/// Unresolved accrual order picked up by the reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOrder {
    pub number: String,
    pub owner: String,
    pub status: OrderStatus,
}

impl Ledger {
    /// Register an accrual order for `owner`
    ///
    /// `Err(OrderOwnedByAnotherUser)` when somebody else holds the number,
    /// `Err(InvalidOrderNumber)` when the checksum fails (nothing is stored).
    pub async fn register_order(
        &self,
        owner: &str,
        number: &str,
    ) -> Result<Registration, LedgerError> {
        if !luhn::is_valid(number) {
            return Err(LedgerError::InvalidOrderNumber);
        }

        if let Some(existing) = orders::find_owner(&self.pool, number).await? {
            return arbitrate(owner, &existing);
        }

        match orders::insert_accrual(&self.pool, number, owner, now_millis()).await {
            Ok(()) => {
                tracing::info!(order = %number, owner = %owner, "Order registered");
                Ok(Registration::Accepted)
            }
            Err(e) if db::is_unique_violation(&e) => {
                // Lost the race to a concurrent insert
                let existing = orders::find_owner(&self.pool, number)
                    .await?
                    .ok_or_else(|| LedgerError::OrderNotFound(number.to_string()))?;
                tracing::debug!(order = %number, owner = %existing, "Concurrent registration resolved by constraint");
                arbitrate(owner, &existing)
            }
            Err(e) if db::is_foreign_key_violation(&e) => {
                Err(LedgerError::UserNotFound(owner.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Accrual orders of `owner`, oldest first
    ///
    /// `accrual` is only filled for PROCESSED orders.
    pub async fn list_orders(&self, owner: &str) -> Result<Vec<OrderView>, LedgerError> {
        let rows = orders::list_accrual(&self.pool, owner).await?;
        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            let status = parse_status(&row.number, &row.status)?;
            views.push(OrderView {
                accrual: (status == OrderStatus::Processed).then(|| money::from_minor_units(row.accrual)),
                number: row.number,
                status,
                uploaded_at: millis_to_rfc3339(row.uploaded_at),
            });
        }
        Ok(views)
    }

    /// Up to `limit` unresolved accrual orders, oldest first
    pub async fn pending_orders(&self, limit: i64) -> Result<Vec<PendingOrder>, LedgerError> {
        let rows = orders::pending(&self.pool, limit).await?;
        rows.into_iter()
            .map(|row| {
                let status = parse_status(&row.number, &row.status)?;
                Ok(PendingOrder {
                    number: row.number,
                    owner: row.owner,
                    status,
                })
            })
            .collect()
    }

    /// NEW → PROCESSING; false when the order was not NEW
    pub async fn mark_processing(&self, number: &str) -> Result<bool, LedgerError> {
        Ok(orders::mark_processing(&self.pool, number).await? > 0)
    }
}

fn arbitrate(caller: &str, owner: &str) -> Result<Registration, LedgerError> {
    held_by_caller(caller, owner).map(|()| Registration::AlreadyOwnedByCaller)
}

fn parse_status(number: &str, raw: &str) -> Result<OrderStatus, LedgerError> {
    OrderStatus::from_db(raw).ok_or_else(|| {
        LedgerError::Storage(sqlx::Error::Decode(
            format!("order {number} has unknown status {raw:?}").into(),
        ))
    })
}
