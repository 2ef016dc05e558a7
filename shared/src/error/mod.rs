//! Unified error system
//!
//! - [`ErrorCode`]: numeric codes shared by the server and its clients
//! - [`ErrorCategory`]: classification of codes by range
//! - [`AppError`]: code + message + optional details, rendered as HTTP
//! - [`ApiResponse`]: JSON envelope used for error bodies
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 4xxx: Order errors
//! - 5xxx: Balance errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::new(ErrorCode::InsufficientBalance);
//! assert_eq!(err.http_status(), http::StatusCode::PAYMENT_REQUIRED);
//!
//! let err = AppError::validation("login must not be empty").with_detail("field", "login");
//! let body = ApiResponse::<()>::error(&err);
//! assert_eq!(body.code, Some(2));
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
