//! Point amount conversions
//!
//! Points travel as `Decimal` with two fractional digits and are stored as
//! integer hundredths, so ledger arithmetic in SQL stays exact.

use rust_decimal::prelude::*;

/// Points are tracked to the hundredth
const DECIMAL_PLACES: u32 = 2;

/// Largest amount accepted into the ledger (10^13 points)
const MAX_POINTS: Decimal = Decimal::from_parts(0x4e72a000, 0x918, 0, false, 0);

/// Round an amount reported by the accrual service (half away from zero)
pub fn round_points(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Bring an accrual amount into the range the ledger stores
///
/// Rounds to the hundredth, then clamps to `0..=MAX_POINTS`.
pub fn clamp_points(value: Decimal) -> Decimal {
    round_points(value).clamp(Decimal::ZERO, MAX_POINTS)
}

/// Exact conversion to hundredths
///
/// `None` for negative values, more than two fractional digits, or values
/// beyond [`MAX_POINTS`].
pub fn to_minor_units(value: Decimal) -> Option<i64> {
    if value.is_sign_negative() || value > MAX_POINTS {
        return None;
    }
    if value.normalize().scale() > DECIMAL_PLACES {
        return None;
    }
    (value * Decimal::ONE_HUNDRED).to_i64()
}

/// Hundredths back to points
pub fn from_minor_units(units: i64) -> Decimal {
    Decimal::new(units, DECIMAL_PLACES)
}
