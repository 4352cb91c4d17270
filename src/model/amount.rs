//! Amount type for whole-unit, non-negative money values.
//!
//! Sheet cells come back formatted (`15,000`, `₩15,000`, `15000원`), so parsing strips currency
//! symbols and thousands separators before handing the number to `Decimal`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::iter::Sum;
use std::str::FromStr;

/// Currency markers that may surround a number in a formatted cell.
const CURRENCY_MARKERS: &[char] = &['₩', '$', '원', '\u{FFE6}'];

/// A non-negative amount of money in whole currency units.
///
/// # Examples
///
/// ```
/// # use couple_ledger::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("₩15,000").unwrap();
/// assert_eq!(a.value(), 15000);
/// assert_eq!(a.to_string(), "15000");
/// assert_eq!(a.formatted(), "15,000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the number of whole currency units.
    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, saturating at `u64::MAX`.
    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    /// Formats with thousands separators, e.g. `1,234,567`.
    pub fn formatted(&self) -> String {
        format_num::format_num!(",.0", self.0 as f64)
    }
}

/// An error that can occur when parsing a cell or user input into an `Amount`.
pub enum AmountError {
    Empty,
    Decimal(rust_decimal::Error),
    Negative(Decimal),
    Fractional(Decimal),
    TooLarge(Decimal),
}

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::Empty => f.write_str("An amount is required"),
            AmountError::Decimal(e) => write!(f, "Invalid amount: {e}"),
            AmountError::Negative(d) => write!(f, "An amount must not be negative, got {d}"),
            AmountError::Fractional(d) => {
                write!(f, "An amount must be a whole number of units, got {d}")
            }
            AmountError::TooLarge(d) => write!(f, "The amount {d} is too large"),
        }
    }
}

impl Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AmountError::Decimal(e) => Some(e),
            _ => None,
        }
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AmountError::Negative(value));
        }
        if !value.fract().is_zero() {
            return Err(AmountError::Fractional(value));
        }
        value
            .to_u64()
            .map(Amount)
            .ok_or(AmountError::TooLarge(value))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s
            .trim()
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace() && !CURRENCY_MARKERS.contains(c))
            .collect();
        if cleaned.is_empty() {
            return Err(AmountError::Empty);
        }
        let value = Decimal::from_str(&cleaned).map_err(AmountError::Decimal)?;
        Amount::try_from(value)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount(value)
    }
}

impl From<Amount> for u64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Amount::saturating_add)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }
}

/// Accepts JSON numbers as well as strings, since hand-edited store files may contain either.
struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative whole number or a numeric string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        u64::try_from(v)
            .map(Amount)
            .map_err(|_| E::custom(AmountError::Negative(Decimal::from(v))))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        let d = Decimal::try_from(v).map_err(|e| E::custom(AmountError::Decimal(e)))?;
        Amount::try_from(d).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::from_str(v).map_err(E::custom)
    }
}
