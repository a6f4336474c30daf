//! `NUMERIC(12, 2)` handling for monetary columns.
//!
//! SQLite has no fixed-point type and its NUMERIC affinity would coerce
//! `"0.50"` into the REAL `0.5`, so costs are stored in TEXT columns as the
//! canonical two-decimal string of a [`Decimal`].

use rust_decimal::{Decimal, RoundingStrategy};
use rusqlite::types::Type;
use rusqlite::Row;

use crate::error::{Result, StoreError};

/// Total significant digits allowed.
pub const PRECISION: u32 = 12;
/// Digits after the decimal point.
pub const SCALE: u32 = 2;

/// Rounds `value` to [`SCALE`] places (half away from zero) and checks that
/// it fits in [`PRECISION`] digits.
pub fn normalize(value: Decimal) -> Result<Decimal> {
    let mut rounded = value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(SCALE);
    let limit = Decimal::from(10_i64.pow(PRECISION - SCALE));
    if rounded.abs() >= limit {
        return Err(StoreError::InvalidNumeric(format!(
            "{value} needs more than {} integer digits",
            PRECISION - SCALE
        )));
    }
    Ok(rounded)
}

/// Parses the canonical text written for a normalised value.
pub fn parse(text: &str) -> Result<Decimal> {
    let value: Decimal = text
        .parse()
        .map_err(|e| StoreError::InvalidNumeric(format!("{text:?}: {e}")))?;
    normalize(value)
}

/// Reads a decimal column inside a rusqlite row mapper.
pub(crate) fn column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    parse(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn pads_to_two_places() {
        assert_eq!(normalize(dec!(0.5)).unwrap().to_string(), "0.50");
        assert_eq!(normalize(dec!(1)).unwrap().to_string(), "1.00");
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(normalize(dec!(0.125)).unwrap(), dec!(0.13));
        assert_eq!(normalize(dec!(-0.125)).unwrap(), dec!(-0.13));
        assert_eq!(normalize(dec!(2.994)).unwrap(), dec!(2.99));
    }

    #[test]
    fn rejects_more_than_ten_integer_digits() {
        assert!(normalize(dec!(9999999999.99)).is_ok());
        assert!(matches!(
            normalize(dec!(10000000000.00)),
            Err(StoreError::InvalidNumeric(_))
        ));
        // rounding up can overflow too
        assert!(normalize(dec!(9999999999.995)).is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse("0.75").unwrap(), dec!(0.75));
        assert!(matches!(parse("0.5.0"), Err(StoreError::InvalidNumeric(_))));
    }
}
