//! Grid arithmetic on decimals.

use rust_decimal::{Decimal, RoundingStrategy};

/// Floor `value` to a multiple of `step`. A non-positive step leaves the value untouched.
#[must_use]
pub fn floor_to_step(value: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return value;
    }
    value
        .checked_div(step)
        .map_or(value, |units| units.floor() * step)
}

/// Ceil `value` to a multiple of `step`. Values already on the grid are returned as-is.
#[must_use]
pub fn ceil_to_step(value: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return value;
    }
    let Some(units) = value.checked_div(step) else {
        return value;
    };
    if units.fract().is_zero() {
        return value;
    }
    units.ceil() * step
}

/// Truncate toward zero to exactly `decimals` places, padding with zeros.
///
/// The returned decimal carries scale `decimals`, so its `Display` output is
/// the fixed-point string the exchange expects (`0.8540`, never `0.854` or
/// `8.54E-1`).
#[must_use]
pub fn truncate_to(value: Decimal, decimals: u32) -> Decimal {
    let mut truncated = value.round_dp_with_strategy(decimals, RoundingStrategy::ToZero);
    truncated.rescale(decimals);
    truncated
}

/// Significant fractional digits of a decimal (`0.00100` → 3, `1` → 0).
#[must_use]
pub fn decimal_places(value: Decimal) -> u32 {
    value.normalize().scale()
}
