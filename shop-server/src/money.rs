//! Money arithmetic with rust_decimal
//!
//! Amounts are stored as integer cents. Percentages arrive as `f64` from
//! configuration rows and are converted once, then all math is `Decimal`.

use rust_decimal::prelude::*;

/// Rounding for every cent result: half away from zero (2.5 -> 3, -2.5 -> -3)
const ROUNDING: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

/// Convert f64 to Decimal; non-finite input becomes zero
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// `cents × percent / 100`, rounded to whole cents
pub fn percent_of_cents(cents: i64, percent: f64) -> i64 {
    let amount = Decimal::from(cents) * to_decimal(percent) / Decimal::ONE_HUNDRED;
    amount
        .round_dp_with_strategy(0, ROUNDING)
        .to_i64()
        .unwrap_or_default()
}

/// Cents as a major-unit decimal string (`2599` -> `"25.99"`)
pub fn cents_to_major(cents: i64) -> String {
    Decimal::new(cents, 2).to_string()
}
