//! Balance and withdrawal models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Current points balance (`GET /api/user/balance`)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Balance {
    #[serde(with = "rust_decimal::serde::float")]
    pub current: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub withdrawn: Decimal,
}

/// Withdrawal request (`POST /api/user/balance/withdraw`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawRequest {
    /// Order number the points are spent against
    pub order: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub sum: Decimal,
}

/// One entry of the withdrawal history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WithdrawalView {
    pub order: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub sum: Decimal,
    /// RFC 3339
    pub processed_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_withdraw_request_from_json() {
        let req: WithdrawRequest =
            serde_json::from_str(r#"{"order":"2377225624","sum":751}"#).unwrap();
        assert_eq!(req.order, "2377225624");
        assert_eq!(req.sum, Decimal::from(751));

        let req: WithdrawRequest =
            serde_json::from_str(r#"{"order":"2377225624","sum":10.25}"#).unwrap();
        assert_eq!(req.sum, Decimal::new(1025, 2));
    }

    #[test]
    fn test_balance_serializes_as_numbers() {
        let balance = Balance {
            current: Decimal::new(50050, 2),
            withdrawn: Decimal::from(42),
        };
        let json = serde_json::to_value(balance).unwrap();
        assert_eq!(json["current"].as_f64(), Some(500.5));
        assert_eq!(json["withdrawn"].as_f64(), Some(42.0));
        assert_eq!(
            serde_json::to_string(&balance).unwrap(),
            r#"{"current":500.5,"withdrawn":42.0}"#
        );
    }

    #[test]
    fn test_withdrawal_view_sum_is_number() {
        let view = WithdrawalView {
            order: "2377225624".to_string(),
            sum: Decimal::new(72_850, 2),
            processed_at: "2020-12-09T16:09:57+03:00".to_string(),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["sum"].is_number());
        assert_eq!(json["sum"].as_f64(), Some(728.5));
    }
}
