//! Credits, debits and balance queries
//!
//! Credit and debit each run in one transaction whose first statement is a
//! write, so SQLite hands out the write lock before anything is read and a
//! concurrent writer waits on the busy timeout instead of reading a stale
//! balance.

use rust_decimal::Decimal;
use shared::util::{millis_to_rfc3339, now_millis};
use shared::{Balance, OrderStatus, WithdrawalView};

use super::{Ledger, LedgerError, held_by_caller, luhn, money};
use crate::db::{self, orders, users};

/// Result of applying an accrual verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreditOutcome {
    /// Status updated (and balance credited for PROCESSED)
    Applied { owner: String },
    /// The order was already terminal; nothing changed
    AlreadyResolved,
}

/// Successful withdrawal request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    /// Points spent against a new order number
    Withdrawn,
    /// The caller already holds this number; balance untouched
    AlreadyOwnedByCaller,
}

/// Withdrawal history of one user
#[derive(Debug, Clone, PartialEq)]
pub enum WithdrawalHistory {
    Empty,
    /// Oldest first
    Entries(Vec<WithdrawalView>),
}

impl Ledger {
    /// Apply a terminal accrual verdict to an unresolved order
    ///
    /// The status change and the balance increment commit together. An order
    /// that is already PROCESSED/INVALID is left alone, so each accrual is
    /// credited at most once.
    pub async fn credit(
        &self,
        number: &str,
        status: OrderStatus,
        amount: Decimal,
    ) -> Result<CreditOutcome, LedgerError> {
        let units = match status {
            OrderStatus::Processed => {
                let points = money::clamp_points(amount);
                if points != money::round_points(amount) {
                    tracing::warn!(
                        order = %number,
                        accrual = %amount,
                        credited = %points,
                        "Accrual outside the accepted range, clamped"
                    );
                }
                money::to_minor_units(points).ok_or(LedgerError::InvalidAmount)?
            }
            OrderStatus::Invalid => 0,
            other => return Err(LedgerError::NotTerminal(other)),
        };

        let mut tx = self.pool.begin().await?;

        let Some(owner) = orders::resolve(&mut *tx, number, status, units).await? else {
            tx.rollback().await?;
            return match orders::find(&self.pool, number).await? {
                Some(_) => Ok(CreditOutcome::AlreadyResolved),
                None => Err(LedgerError::OrderNotFound(number.to_string())),
            };
        };

        if units > 0 && users::credit(&mut *tx, &owner, units).await? != 1 {
            tx.rollback().await?;
            return Err(LedgerError::UserNotFound(owner));
        }

        tx.commit().await?;

        tracing::info!(
            order = %number,
            owner = %owner,
            status = %status,
            accrual = %money::from_minor_units(units),
            "Accrual applied"
        );
        Ok(CreditOutcome::Applied { owner })
    }

    /// Spend `amount` points of `owner` against a new order number
    ///
    /// Rejections and repeats leave the balance and the orders table
    /// untouched.
    pub async fn debit(
        &self,
        owner: &str,
        number: &str,
        amount: Decimal,
    ) -> Result<DebitOutcome, LedgerError> {
        if !luhn::is_valid(number) {
            return Err(LedgerError::InvalidOrderNumber);
        }
        let units = money::to_minor_units(amount)
            .filter(|units| *units > 0)
            .ok_or(LedgerError::InvalidAmount)?;

        let mut tx = self.pool.begin().await?;

        // Check and decrement in one statement inside the transaction
        if users::debit(&mut *tx, owner, units).await? == 0 {
            let exists = users::balance(&mut *tx, owner).await?.is_some();
            let holder = orders::find_owner(&mut *tx, number).await?;
            tx.rollback().await?;
            if !exists {
                return Err(LedgerError::UserNotFound(owner.to_string()));
            }
            // A held number is answered the same way whatever the balance
            return match holder {
                Some(existing) => already_held(owner, number, &existing),
                None => Err(LedgerError::InsufficientBalance),
            };
        }

        if let Some(existing) = orders::find_owner(&mut *tx, number).await? {
            tx.rollback().await?;
            return already_held(owner, number, &existing);
        }

        if let Err(e) = orders::insert_withdrawal(&mut *tx, number, owner, units, now_millis()).await {
            tx.rollback().await?;
            if db::is_unique_violation(&e) {
                let existing = orders::find_owner(&self.pool, number)
                    .await?
                    .ok_or_else(|| LedgerError::OrderNotFound(number.to_string()))?;
                return already_held(owner, number, &existing);
            }
            return Err(e.into());
        }

        tx.commit().await?;

        tracing::info!(order = %number, owner = %owner, sum = %amount, "Points withdrawn");
        Ok(DebitOutcome::Withdrawn)
    }

    /// Current balance and total withdrawn
    pub async fn balance(&self, owner: &str) -> Result<Balance, LedgerError> {
        let (balance, withdrawn) = users::balance(&self.pool, owner)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(owner.to_string()))?;
        Ok(Balance {
            current: money::from_minor_units(balance),
            withdrawn: money::from_minor_units(withdrawn),
        })
    }

    /// Withdrawals of `owner`, oldest first
    pub async fn withdrawal_history(&self, owner: &str) -> Result<WithdrawalHistory, LedgerError> {
        let rows = orders::list_withdrawals(&self.pool, owner).await?;
        if rows.is_empty() {
            return Ok(WithdrawalHistory::Empty);
        }
        Ok(WithdrawalHistory::Entries(
            rows.into_iter()
                .map(|row| WithdrawalView {
                    order: row.number,
                    sum: money::from_minor_units(row.bonuses_withdrawn),
                    processed_at: millis_to_rfc3339(row.uploaded_at),
                })
                .collect(),
        ))
    }
}

fn already_held(caller: &str, number: &str, owner: &str) -> Result<DebitOutcome, LedgerError> {
    held_by_caller(caller, owner)?;
    tracing::debug!(order = %number, owner = %owner, "Withdrawal repeated by its owner");
    Ok(DebitOutcome::AlreadyOwnedByCaller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::test_support::ledger_with_users;

    fn points(value: i64) -> Decimal {
        Decimal::from(value)
    }

    /// Register + credit `amount` through order `number`
    async fn fund(ledger: &Ledger, owner: &str, number: &str, amount: Decimal) {
        ledger.register_order(owner, number).await.unwrap();
        let outcome = ledger.credit(number, OrderStatus::Processed, amount).await.unwrap();
        assert_eq!(outcome, CreditOutcome::Applied { owner: owner.to_string() });
    }

    #[tokio::test]
    async fn test_credit_processed() {
        let ledger = ledger_with_users(&["alice"]).await;
        fund(&ledger, "alice", "12345678903", Decimal::new(5005, 1)).await;

        let balance = ledger.balance("alice").await.unwrap();
        assert_eq!(balance.current, Decimal::new(5005, 1));
        assert_eq!(balance.withdrawn, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_credit_invalid_leaves_balance() {
        let ledger = ledger_with_users(&["alice"]).await;
        ledger.register_order("alice", "12345678903").await.unwrap();

        let outcome = ledger
            .credit("12345678903", OrderStatus::Invalid, points(100))
            .await
            .unwrap();
        assert!(matches!(outcome, CreditOutcome::Applied { .. }));
        assert_eq!(ledger.balance("alice").await.unwrap().current, Decimal::ZERO);

        let orders = ledger.list_orders("alice").await.unwrap();
        assert_eq!(orders[0].status, OrderStatus::Invalid);
        assert_eq!(orders[0].accrual, None);
    }

    #[tokio::test]
    async fn test_credit_applies_once() {
        let ledger = ledger_with_users(&["alice"]).await;
        fund(&ledger, "alice", "12345678903", points(50)).await;

        let again = ledger
            .credit("12345678903", OrderStatus::Processed, points(50))
            .await
            .unwrap();
        assert_eq!(again, CreditOutcome::AlreadyResolved);
        assert_eq!(ledger.balance("alice").await.unwrap().current, points(50));
    }

    #[tokio::test]
    async fn test_credit_rejects_non_terminal_and_unknown() {
        let ledger = ledger_with_users(&["alice"]).await;
        let err = ledger
            .credit("12345678903", OrderStatus::Processing, points(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotTerminal(OrderStatus::Processing)));

        let err = ledger
            .credit("12345678903", OrderStatus::Processed, points(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_credit_clamps_out_of_range_accrual() {
        let ledger = ledger_with_users(&["alice"]).await;
        ledger.register_order("alice", "12345678903").await.unwrap();
        ledger.register_order("alice", "79927398713").await.unwrap();

        // Resolved once instead of failing on every cycle
        let outcome = ledger
            .credit("12345678903", OrderStatus::Processed, Decimal::MAX)
            .await
            .unwrap();
        assert!(matches!(outcome, CreditOutcome::Applied { .. }));
        let outcome = ledger
            .credit("79927398713", OrderStatus::Processed, points(-20))
            .await
            .unwrap();
        assert!(matches!(outcome, CreditOutcome::Applied { .. }));

        assert!(ledger.pending_orders(10).await.unwrap().is_empty());
        let expected = money::clamp_points(Decimal::MAX);
        assert_eq!(ledger.balance("alice").await.unwrap().current, expected);

        let orders = ledger.list_orders("alice").await.unwrap();
        assert_eq!(orders[0].accrual, Some(expected));
        assert_eq!(orders[1].accrual, Some(Decimal::ZERO));
    }

    #[tokio::test]
    async fn test_credit_rolls_back_when_balance_update_fails() {
        let ledger = ledger_with_users(&["alice"]).await;
        ledger.register_order("alice", "12345678903").await.unwrap();

        // Storage failure between the order update and the balance increment
        sqlx::query(
            "CREATE TRIGGER fail_balance BEFORE UPDATE OF balance ON users
             BEGIN SELECT RAISE(ABORT, 'simulated storage failure'); END",
        )
        .execute(ledger.pool())
        .await
        .unwrap();

        let err = ledger
            .credit("12345678903", OrderStatus::Processed, points(50))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Storage(_)));

        let orders = ledger.list_orders("alice").await.unwrap();
        assert_eq!(orders[0].status, OrderStatus::New);
        assert_eq!(orders[0].accrual, None);
        assert_eq!(ledger.balance("alice").await.unwrap().current, Decimal::ZERO);

        // Once storage recovers the same verdict applies cleanly
        sqlx::query("DROP TRIGGER fail_balance")
            .execute(ledger.pool())
            .await
            .unwrap();
        ledger
            .credit("12345678903", OrderStatus::Processed, points(50))
            .await
            .unwrap();
        assert_eq!(ledger.balance("alice").await.unwrap().current, points(50));
    }

    #[tokio::test]
    async fn test_debit_success() {
        let ledger = ledger_with_users(&["alice"]).await;
        fund(&ledger, "alice", "12345678903", points(729)).await;

        ledger
            .debit("alice", "2377225624", Decimal::new(75_125, 2))
            .await
            .unwrap_err();
        ledger
            .debit("alice", "2377225624", Decimal::new(72_850, 2))
            .await
            .unwrap();

        let balance = ledger.balance("alice").await.unwrap();
        assert_eq!(balance.current, Decimal::new(50, 2));
        assert_eq!(balance.withdrawn, Decimal::new(72_850, 2));

        match ledger.withdrawal_history("alice").await.unwrap() {
            WithdrawalHistory::Entries(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].order, "2377225624");
                assert_eq!(entries[0].sum, Decimal::new(72_850, 2));
            }
            WithdrawalHistory::Empty => panic!("expected one withdrawal"),
        }
    }

    #[tokio::test]
    async fn test_debit_insufficient_balance() {
        let ledger = ledger_with_users(&["alice"]).await;
        fund(&ledger, "alice", "12345678903", points(10)).await;

        let err = ledger.debit("alice", "2377225624", points(11)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance));

        assert_eq!(ledger.balance("alice").await.unwrap().current, points(10));
        assert_eq!(
            ledger.withdrawal_history("alice").await.unwrap(),
            WithdrawalHistory::Empty
        );
    }

    #[tokio::test]
    async fn test_debit_validation() {
        let ledger = ledger_with_users(&["alice"]).await;
        fund(&ledger, "alice", "12345678903", points(10)).await;

        let err = ledger.debit("alice", "12345678901", points(1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidOrderNumber));

        for bad in [Decimal::ZERO, points(-1), Decimal::new(1, 3)] {
            let err = ledger.debit("alice", "2377225624", bad).await.unwrap_err();
            assert!(matches!(err, LedgerError::InvalidAmount), "{bad} accepted");
        }
        assert_eq!(ledger.balance("alice").await.unwrap().current, points(10));
    }

    #[tokio::test]
    async fn test_debit_ownership_conflicts_roll_back() {
        let ledger = ledger_with_users(&["alice", "bob"]).await;
        fund(&ledger, "alice", "12345678903", points(100)).await;
        ledger.register_order("bob", "79927398713").await.unwrap();

        // Caller's own accrual order
        let outcome = ledger.debit("alice", "12345678903", points(5)).await.unwrap();
        assert_eq!(outcome, DebitOutcome::AlreadyOwnedByCaller);

        // Someone else's order
        let err = ledger.debit("alice", "79927398713", points(5)).await.unwrap_err();
        assert!(matches!(err, LedgerError::OrderOwnedByAnotherUser));

        let balance = ledger.balance("alice").await.unwrap();
        assert_eq!(balance.current, points(100));
        assert_eq!(balance.withdrawn, Decimal::ZERO);

        // Repeating a withdrawal is a no-op for its owner
        let first = ledger.debit("alice", "2377225624", points(5)).await.unwrap();
        assert_eq!(first, DebitOutcome::Withdrawn);
        let repeat = ledger.debit("alice", "2377225624", points(5)).await.unwrap();
        assert_eq!(repeat, DebitOutcome::AlreadyOwnedByCaller);
        // Still a no-op when the balance no longer covers the amount
        let repeat = ledger.debit("alice", "2377225624", points(1_000)).await.unwrap();
        assert_eq!(repeat, DebitOutcome::AlreadyOwnedByCaller);
        let err = ledger.register_order("bob", "2377225624").await.unwrap_err();
        assert!(matches!(err, LedgerError::OrderOwnedByAnotherUser));
        let balance = ledger.balance("alice").await.unwrap();
        assert_eq!(balance.current, points(95));
        assert_eq!(balance.withdrawn, points(5));
    }

    #[tokio::test]
    async fn test_withdrawal_orders_are_never_pending() {
        let ledger = ledger_with_users(&["alice"]).await;
        fund(&ledger, "alice", "12345678903", points(100)).await;
        ledger.debit("alice", "2377225624", points(30)).await.unwrap();

        assert!(ledger.pending_orders(10).await.unwrap().is_empty());
        assert_eq!(ledger.list_orders("alice").await.unwrap().len(), 1);

        // A verdict for the withdrawal number changes nothing
        let outcome = ledger
            .credit("2377225624", OrderStatus::Processed, points(500))
            .await
            .unwrap();
        assert_eq!(outcome, CreditOutcome::AlreadyResolved);
        assert!(!ledger.mark_processing("2377225624").await.unwrap());
        assert_eq!(ledger.balance("alice").await.unwrap().current, points(70));
    }

    #[tokio::test]
    async fn test_balance_equation() {
        let ledger = ledger_with_users(&["alice"]).await;
        let credits = [
            ("12345678903", Decimal::new(5005, 1)),
            ("79927398713", points(120)),
            ("4561261212345467", Decimal::new(1, 2)),
        ];
        let debits = [
            ("2377225624", points(300)),
            ("9278923470", Decimal::new(7525, 2)),
            ("346436439", points(10_000)), // rejected
            ("49927398716", Decimal::new(24_526, 2)),
        ];

        let mut credited = Decimal::ZERO;
        let mut withdrawn = Decimal::ZERO;
        for (i, (number, amount)) in credits.iter().enumerate() {
            fund(&ledger, "alice", number, *amount).await;
            credited += *amount;

            let (debit_number, debit_amount) = debits[i];
            if ledger.debit("alice", debit_number, debit_amount).await.is_ok() {
                withdrawn += debit_amount;
            }

            let balance = ledger.balance("alice").await.unwrap();
            assert_eq!(balance.current, credited - withdrawn);
            assert_eq!(balance.withdrawn, withdrawn);
            assert!(balance.current >= Decimal::ZERO);
        }

        let (last_number, last_amount) = debits[3];
        ledger.debit("alice", last_number, last_amount).await.unwrap();
        withdrawn += last_amount;
        let balance = ledger.balance("alice").await.unwrap();
        assert_eq!(balance.current, credited - withdrawn);
        assert_eq!(balance.current, Decimal::ZERO);
    }
}
