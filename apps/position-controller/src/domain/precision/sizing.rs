//! Position sizing: margin × leverage / entry, snapped to the order grid.

use rust_decimal::Decimal;

use super::PrecisionProfile;
use crate::domain::shared::{DomainError, Symbol};

/// Notional and quantity of a sized order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizedOrder {
    /// margin × leverage.
    pub notional: Decimal,
    /// notional / entry before any rounding.
    pub raw_quantity: Decimal,
    /// Exchange-legal quantity, with the scale it is sent with.
    pub quantity: Decimal,
}

/// Size an opening order.
///
/// Fails with `InvalidValue` for a non-positive entry, margin or leverage,
/// and with `ZeroQuantity` when the grid floors the quantity to zero. Either
/// way no order should be sent.
pub fn size_order(
    profile: &PrecisionProfile,
    symbol: &Symbol,
    entry: Decimal,
    margin: Decimal,
    leverage: u32,
) -> Result<SizedOrder, DomainError> {
    if entry <= Decimal::ZERO {
        return Err(DomainError::invalid("entry", "must be greater than 0"));
    }
    if margin <= Decimal::ZERO {
        return Err(DomainError::invalid("margin", "must be greater than 0"));
    }
    if leverage == 0 {
        return Err(DomainError::invalid("leverage", "must be greater than 0"));
    }

    let notional = margin * Decimal::from(leverage);
    let raw_quantity = notional
        .checked_div(entry)
        .ok_or_else(|| DomainError::invalid("entry", "quantity overflows"))?;
    let quantity = profile.quantize_quantity(raw_quantity);

    if quantity <= Decimal::ZERO {
        return Err(DomainError::ZeroQuantity {
            symbol: symbol.to_string(),
            raw: raw_quantity.to_string(),
        });
    }

    Ok(SizedOrder {
        notional,
        raw_quantity,
        quantity,
    })
}
