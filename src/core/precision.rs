//! Fixed-scale decimal rounding shared by every pipeline stage.
//!
//! Price-derived quantities carry 8 decimal places, percentages and
//! ratios carry 4. Both round half away from zero.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

pub const PRICE_SCALE: u32 = 8;
pub const RATIO_SCALE: u32 = 4;

pub fn round_price(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub fn round_ratio(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATIO_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `(to - from) / from` at ratio scale; zero when `from` is zero.
pub fn ratio_change(from: Decimal, to: Decimal) -> Decimal {
    if from.is_zero() {
        return Decimal::ZERO;
    }
    round_ratio((to - from) / from)
}

/// [`ratio_change`] expressed in percent.
pub fn percent_change(from: Decimal, to: Decimal) -> Decimal {
    ratio_change(from, to) * dec!(100)
}

pub fn midpoint(high: Decimal, low: Decimal) -> Decimal {
    round_price((high + low) / dec!(2))
}
