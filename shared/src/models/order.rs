//! Order Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order status
///
/// `New` and `Processing` are unresolved and still polled against the
/// accrual service; `Invalid` and `Processed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    New,
    Processing,
    Invalid,
    Processed,
}

impl OrderStatus {
    /// Storage / wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Processing => "PROCESSING",
            Self::Invalid => "INVALID",
            Self::Processed => "PROCESSED",
        }
    }

    /// Parse the stored TEXT column
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(Self::New),
            "PROCESSING" => Some(Self::Processing),
            "INVALID" => Some(Self::Invalid),
            "PROCESSED" => Some(Self::Processed),
            _ => None,
        }
    }

    /// No further polling happens once an order is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Invalid | Self::Processed)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accrual order as listed to its owner (`GET /api/user/orders`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderView {
    pub number: String,
    pub status: OrderStatus,
    /// Only present once the order is `PROCESSED`
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub accrual: Option<Decimal>,
    /// RFC 3339
    pub uploaded_at: String,
}
