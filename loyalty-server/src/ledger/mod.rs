//! Balance ledger
//!
//! Owns every write to `users.balance` and to order ownership:
//!
//! - [`registrar`]: accrual order registration with ownership arbitration
//! - [`balance`]: credit on accrual, debit on withdrawal, balance queries
//! - [`accounts`]: user registration and password checks
//!
//! All outcomes are reported through [`LedgerError`] plus a few small
//! success enums; the HTTP layer maps them to status codes in one place.

pub mod accounts;
pub mod balance;
pub mod luhn;
pub mod money;
pub mod registrar;

pub use balance::{CreditOutcome, DebitOutcome, WithdrawalHistory};
pub use registrar::{PendingOrder, Registration};

use shared::OrderStatus;
use sqlx::SqlitePool;
use thiserror::Error;

/// Ledger / registrar outcomes other than plain success
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("order number fails the Luhn check")]
    InvalidOrderNumber,

    #[error("amount must be positive with at most two decimal places")]
    InvalidAmount,

    #[error("order number has already been uploaded by another user")]
    OrderOwnedByAnotherUser,

    #[error("not enough points on balance")]
    InsufficientBalance,

    #[error("only terminal statuses can be credited, got {0}")]
    NotTerminal(OrderStatus),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("login already taken: {0}")]
    LoginTaken(String),

    #[error("invalid login or password")]
    InvalidCredentials,

    #[error("{0}")]
    Validation(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Ledger service
///
/// Cheap to clone; every operation runs against the injected pool and keeps
/// its transaction scoped to that one operation.
#[derive(Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Ownership arbitration shared by registration and withdrawal
///
/// `Ok` when the caller already holds the number (an idempotent repeat).
fn held_by_caller(caller: &str, owner: &str) -> Result<(), LedgerError> {
    if caller == owner {
        Ok(())
    } else {
        Err(LedgerError::OrderOwnedByAnotherUser)
    }
}
