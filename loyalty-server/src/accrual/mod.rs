//! Accrual service integration
//!
//! - [`client`]: single-attempt HTTP poll against the accrual service
//! - [`reconciler`]: background loop that polls unresolved orders and credits
//!   the ledger
//!
//! The reconciler only sees the [`AccrualSource`] trait, so tests can script
//! the accrual side without a network.

pub mod client;
pub mod reconciler;

pub use client::AccrualClient;
pub use reconciler::{AccrualReconciler, CycleReport, ReconcilerHandle, ReconcilerSettings};

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::OrderStatus;
use thiserror::Error;

/// Order status as reported by the accrual service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccrualStatus {
    Registered,
    Processing,
    Invalid,
    Processed,
}

/// Terminal answer for one order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccrualVerdict {
    Processed(Decimal),
    Invalid,
}

impl AccrualVerdict {
    pub fn status(&self) -> OrderStatus {
        match self {
            Self::Processed(_) => OrderStatus::Processed,
            Self::Invalid => OrderStatus::Invalid,
        }
    }

    pub fn amount(&self) -> Decimal {
        match self {
            Self::Processed(amount) => *amount,
            Self::Invalid => Decimal::ZERO,
        }
    }
}

/// Result of one poll attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// PROCESSED or INVALID; stop polling
    Resolved(AccrualVerdict),
    /// REGISTERED or PROCESSING; ask again later
    Pending(AccrualStatus),
    /// 429, with the server's `Retry-After` when it sent one
    RateLimited(Option<Duration>),
    /// 204, the accrual service does not know the order (yet)
    Unknown,
}

#[derive(Debug, Error)]
pub enum AccrualError {
    #[error("accrual request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("accrual service error: HTTP {0}")]
    ServerError(u16),

    #[error("unexpected accrual response: HTTP {0}")]
    UnexpectedStatus(u16),

    #[error("undecodable accrual response: {0}")]
    Decode(String),
}

/// Something that can be asked about the accrual state of one order
#[async_trait]
pub trait AccrualSource: Send + Sync {
    /// One attempt; never retries internally
    async fn poll(&self, number: &str) -> Result<PollOutcome, AccrualError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_deserialize() {
        let status: AccrualStatus = serde_json::from_str("\"REGISTERED\"").unwrap();
        assert_eq!(status, AccrualStatus::Registered);
        let status: AccrualStatus = serde_json::from_str("\"PROCESSED\"").unwrap();
        assert_eq!(status, AccrualStatus::Processed);
        assert!(serde_json::from_str::<AccrualStatus>("\"DONE\"").is_err());
    }

    #[test]
    fn test_verdict() {
        let verdict = AccrualVerdict::Processed(Decimal::new(5005, 1));
        assert_eq!(verdict.status(), OrderStatus::Processed);
        assert_eq!(verdict.amount(), Decimal::new(5005, 1));
        assert_eq!(AccrualVerdict::Invalid.status(), OrderStatus::Invalid);
        assert_eq!(AccrualVerdict::Invalid.amount(), Decimal::ZERO);
    }
}
