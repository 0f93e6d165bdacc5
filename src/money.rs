//! Currency amounts.
//!
//! Amounts are kept as whole cents so that adding up snooze charges never
//! drifts: `1.00 + 1.00 + 0.50` is exactly `2.50`. On disk they are written
//! as plain decimal numbers.

use std::{
    fmt,
    iter::Sum,
    ops::Add,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid amount `{0}`")]
pub struct MoneyError(pub String);

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "f64", into = "f64")]
pub struct Money {
    cents: u64,
}

impl Money {
    pub const ZERO: Self = Self::from_cents(0);

    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    #[must_use]
    pub const fn from_units(units: u64) -> Self {
        Self { cents: units * 100 }
    }

    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self {
            cents: self.cents.saturating_add(rhs.cents),
        }
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    /// Parses `12`, `12.5`, `12.50` or `$12.50`.
    /// Digits past the second decimal place are rounded half up.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MoneyError(s.to_string());
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed);
        let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(err());
        }
        let digits_only = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if !digits_only(whole) || !digits_only(frac) {
            return Err(err());
        }
        let units: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| err())?
        };
        let digits: Vec<u64> = frac.bytes().map(|b| u64::from(b - b'0')).collect();
        let tenths = digits.first().copied().unwrap_or(0);
        let hundredths = digits.get(1).copied().unwrap_or(0);
        let round_up = u64::from(digits.get(2).is_some_and(|d| *d >= 5));
        units
            .checked_mul(100)
            .and_then(|c| c.checked_add(tenths * 10 + hundredths + round_up))
            .map(Self::from_cents)
            .ok_or_else(err)
    }
}

impl TryFrom<f64> for Money {
    type Error = MoneyError;

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value < 0.0 || value > (u64::MAX / 100) as f64 {
            return Err(MoneyError(value.to_string()));
        }
        Ok(Self::from_cents((value * 100.0).round() as u64))
    }
}

impl From<Money> for f64 {
    #[allow(clippy::cast_precision_loss)]
    fn from(money: Money) -> Self {
        money.cents as Self / 100.0
    }
}

/// A snooze charge, never below [`SnoozePrice::MIN`].
///
/// Anything lower, whether constructed in code or read back from storage, is
/// raised to the minimum. Stored values that aren't an amount at all, such as
/// negatives, are read back as the minimum too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "f64", into = "Money")]
pub struct SnoozePrice(Money);

impl SnoozePrice {
    pub const MIN: Self = Self(Money::from_units(1));

    #[must_use]
    pub fn new(amount: Money) -> Self {
        Self(amount.max(Self::MIN.0))
    }

    /// Like [`SnoozePrice::new`] but refuses amounts under the minimum
    /// instead of raising them.
    #[must_use]
    pub fn checked(amount: Money) -> Option<Self> {
        (amount >= Self::MIN.0).then_some(Self(amount))
    }

    #[must_use]
    pub const fn amount(self) -> Money {
        self.0
    }
}

impl Default for SnoozePrice {
    fn default() -> Self {
        Self::MIN
    }
}

impl From<Money> for SnoozePrice {
    fn from(amount: Money) -> Self {
        Self::new(amount)
    }
}

impl From<f64> for SnoozePrice {
    fn from(value: f64) -> Self {
        Money::try_from(value).map_or(Self::MIN, Self::new)
    }
}

impl From<SnoozePrice> for Money {
    fn from(price: SnoozePrice) -> Self {
        price.0
    }
}

impl fmt::Display for SnoozePrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_decimal_amounts_add_exactly() {
        let total: Money = ["1.00", "1.00", "0.50"]
            .iter()
            .map(|s| s.parse::<Money>().unwrap())
            .sum();
        assert_eq!(total, Money::from_cents(250));
        assert_eq!(total.to_string(), "2.50");
    }

    #[test]
    fn parses_loose_decimal_input() {
        assert_eq!("2".parse::<Money>().unwrap(), Money::from_cents(200));
        assert_eq!("2.5".parse::<Money>().unwrap(), Money::from_cents(250));
        assert_eq!("$3.25".parse::<Money>().unwrap(), Money::from_cents(325));
        assert_eq!(".75".parse::<Money>().unwrap(), Money::from_cents(75));
        assert_eq!("1.005".parse::<Money>().unwrap(), Money::from_cents(101));
    }

    #[test]
    fn rejects_garbage() {
        for input in ["", "abc", "-1", "1.2.3", "1,50", "."] {
            assert!(input.parse::<Money>().is_err(), "{input} should not parse");
        }
    }

    #[test]
    fn converts_from_float_by_rounding_to_cents() {
        assert_eq!(Money::try_from(0.1 + 0.2).unwrap(), Money::from_cents(30));
        assert!(Money::try_from(f64::NAN).is_err());
        assert!(Money::try_from(-0.5).is_err());
    }

    #[test]
    fn snooze_price_is_raised_to_minimum() {
        assert_eq!(SnoozePrice::new(Money::from_cents(50)), SnoozePrice::MIN);
        assert_eq!(
            SnoozePrice::new(Money::from_cents(250)).amount(),
            Money::from_cents(250)
        );
        assert_eq!(SnoozePrice::checked(Money::from_cents(99)), None);
    }

    #[test]
    fn stored_price_below_zero_reads_as_minimum() {
        assert_eq!(SnoozePrice::from(-1.0), SnoozePrice::MIN);
        assert_eq!(SnoozePrice::from(f64::NAN), SnoozePrice::MIN);
        assert_eq!(SnoozePrice::from(0.5), SnoozePrice::MIN);
        assert_eq!(SnoozePrice::from(2.5).amount(), Money::from_cents(250));
    }
}
