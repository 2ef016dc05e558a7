//! Ledger outcomes → API errors
//!
//! The one place where [`LedgerError`] variants become transport codes.

use shared::error::{AppError, ErrorCode};

use crate::auth::JwtError;
use crate::ledger::LedgerError;

impl From<LedgerError> for AppError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InvalidOrderNumber => AppError::new(ErrorCode::InvalidOrderNumber),
            LedgerError::InvalidAmount => AppError::new(ErrorCode::InvalidAmount),
            LedgerError::OrderOwnedByAnotherUser => {
                AppError::new(ErrorCode::OrderOwnedByAnotherUser)
            }
            LedgerError::InsufficientBalance => AppError::new(ErrorCode::InsufficientBalance),
            LedgerError::LoginTaken(login) => {
                AppError::new(ErrorCode::LoginTaken).with_detail("login", login)
            }
            LedgerError::InvalidCredentials => AppError::invalid_credentials(),
            // Token for an account that no longer exists
            LedgerError::UserNotFound(_) => AppError::new(ErrorCode::UserNotFound),
            LedgerError::OrderNotFound(number) => {
                AppError::new(ErrorCode::OrderNotFound).with_detail("order", number)
            }
            LedgerError::Validation(msg) => AppError::validation(msg),
            other @ (LedgerError::NotTerminal(_) | LedgerError::PasswordHash(_)) => {
                tracing::error!(error = %other, "Ledger invariant violated");
                AppError::internal(other.to_string())
            }
            LedgerError::Storage(err) => {
                tracing::error!(error = %err, "Ledger storage error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

impl From<JwtError> for AppError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::ExpiredToken => AppError::token_expired(),
            JwtError::GenerationFailed(msg) => AppError::internal(msg),
            other => AppError::invalid_token(other.to_string()),
        }
    }
}
