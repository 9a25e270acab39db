// src/schema/amount.rs

use serde::{Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Number of fraction digits an `Amount` carries.
pub const AMOUNT_SCALE: u32 = 4;
const UNIT: i64 = 10_i64.pow(AMOUNT_SCALE);

/// Exact fixed-point decimal, stored as ten-thousandths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseAmountError {
    #[error("empty amount")]
    Empty,
    #[error("malformed amount {0:?}")]
    Malformed(String),
    #[error("amount {0:?} has more than four fraction digits")]
    TooPrecise(String),
    #[error("amount {0:?} is out of range")]
    OutOfRange(String),
}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Whole units, e.g. `Amount::from_units(300)` is 300.0000.
    pub fn from_units(units: i64) -> Self {
        Amount(units * UNIT)
    }

    /// Ten-thousandths, e.g. `Amount::from_raw(125)` is 0.0125.
    pub const fn from_raw(raw: i64) -> Self {
        Amount(raw)
    }

    pub const fn raw(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// `None` when the result does not fit.
    pub fn checked_add(self, rhs: Amount) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    /// Exact total of `amounts`; `None` on overflow.
    pub fn checked_sum<I>(amounts: I) -> Option<Self>
    where
        I: IntoIterator<Item = Amount>,
    {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, Amount::checked_add)
    }

    /// Round a binary float to the nearest ten-thousandth (half away from zero).
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let scaled = (value * UNIT as f64).round();
        if scaled < i64::MIN as f64 || scaled > i64::MAX as f64 {
            return None;
        }
        Some(Amount(scaled as i64))
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    /// Accepts `[-]digits[.digits]` with at most four fraction digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseAmountError::Empty);
        }
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        let digits_ok = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty())
            || !digits_ok(int_part)
            || !digits_ok(frac_part)
        {
            return Err(ParseAmountError::Malformed(s.to_string()));
        }
        if frac_part.len() > AMOUNT_SCALE as usize {
            return Err(ParseAmountError::TooPrecise(s.to_string()));
        }

        let out_of_range = || ParseAmountError::OutOfRange(s.to_string());
        let int_value: i64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| out_of_range())?
        };
        let mut frac_value: i64 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().map_err(|_| out_of_range())?
        };
        for _ in frac_part.len()..AMOUNT_SCALE as usize {
            frac_value *= 10;
        }
        let raw = int_value
            .checked_mul(UNIT)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(out_of_range)?;
        Ok(Amount(if negative { -raw } else { raw }))
    }
}

impl fmt::Display for Amount {
    /// Shortest exact form: `300`, `12.5`, `-0.0125`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let unit = UNIT as u64;
        let (int, frac) = (abs / unit, abs % unit);
        if frac == 0 {
            return write!(f, "{}{}", sign, int);
        }
        let frac = format!("{:0width$}", frac, width = AMOUNT_SCALE as usize);
        write!(f, "{}{}.{}", sign, int, frac.trim_end_matches('0'))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
