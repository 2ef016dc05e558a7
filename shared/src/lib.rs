//! Shared types for the loyalty backend
//!
//! Common types used by the server and its clients: the unified error
//! system, the order/balance wire models and small utilities.

pub mod error;
pub mod models;
pub mod util;

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use models::{Balance, OrderStatus, OrderView, WithdrawRequest, WithdrawalView};
