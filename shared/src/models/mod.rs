//! Data models
//!
//! Wire types shared between the server and its clients.
//! Point amounts are `Decimal` serialized as JSON numbers.

pub mod balance;
pub mod order;
pub mod user;

// Re-exports
pub use balance::*;
pub use order::*;
pub use user::*;
