//! Ticker quote types and display formatting

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{CoreError, CoreResult, Direction, Symbol};

/// Fractional digits of every displayed numeric field
pub const DISPLAY_DECIMALS: u32 = 2;

/// Latest ticker values for one symbol.
///
/// Numeric fields are decimal strings with exactly [`DISPLAY_DECIMALS`]
/// fractional digits. A quote is replaced whole on every update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub last_price: String,
    pub absolute_change: String,
    pub percent_change: String,
}

impl Quote {
    /// Build a quote from raw exchange strings, rounding each numeric field
    pub fn from_raw(
        symbol: Symbol,
        last_price: &str,
        absolute_change: &str,
        percent_change: &str,
    ) -> CoreResult<Self> {
        Ok(Self {
            last_price: format_field("last_price", last_price)?,
            absolute_change: format_field("absolute_change", absolute_change)?,
            percent_change: format_field("percent_change", percent_change)?,
            symbol,
        })
    }

    /// Direction inferred from the sign of the percent change
    pub fn direction(&self) -> Direction {
        match Decimal::from_str(&self.percent_change) {
            Ok(pct) if pct.is_sign_positive() && !pct.is_zero() => Direction::Up,
            Ok(pct) if pct.is_sign_negative() && !pct.is_zero() => Direction::Down,
            _ => Direction::Flat,
        }
    }
}

/// Round a raw decimal string to two places, half away from zero.
///
/// `"67432.104"` becomes `"67432.10"`, `"68000.005"` becomes `"68000.01"`,
/// `"5"` becomes `"5.00"`. A value that rounds to zero is rendered unsigned.
pub fn format_decimal(raw: &str) -> CoreResult<String> {
    format_field("value", raw)
}

fn format_field(field: &'static str, raw: &str) -> CoreResult<String> {
    let invalid = || CoreError::InvalidDecimal {
        field,
        value: raw.to_string(),
    };

    let value = Decimal::from_str(raw.trim()).map_err(|_| invalid())?;

    let mut rounded =
        value.round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(DISPLAY_DECIMALS);

    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }

    // rescale silently gives up on values with too many integer digits
    if rounded.scale() != DISPLAY_DECIMALS {
        return Err(invalid());
    }

    Ok(rounded.to_string())
}
