// src/format.rs

use crate::error::{PipelineError, Result};
use crate::schema::Amount;

/// One lakh = 100,000.
pub const LAKH: i64 = 100_000;

/// Render `value` in lakhs with two fraction digits: 250000 → `"2.50 Lakh"`.
///
/// Rounding is exact decimal, half away from zero. Negative values are
/// rejected with `InvalidInput`.
pub fn format_scaled(value: Amount) -> Result<String> {
    if value.is_negative() {
        return Err(PipelineError::InvalidInput(format!(
            "cannot format negative amount {} in lakhs",
            value
        )));
    }
    // hundredths of a lakh, in ten-thousandths of a unit
    let step = Amount::from_units(LAKH).raw() / 100;
    let raw = value.raw();
    let hundredths = raw / step + i64::from(raw % step >= step / 2);
    Ok(format!("{}.{:02} Lakh", hundredths / 100, hundredths % 100))
}
