//! Exact fractions used for every musical position.
//!
//! Unlike [`fraction::Fraction`], the numerator is signed and the raw
//! constructor keeps the numbers exactly as given: `2/8` stays `2/8` until
//! it passes through arithmetic. Positions inside a measure are compared by
//! value, so `1/4` and `2/8` are the same place.
//!
//! # Example
//!
//! ```
//! use note_editor::primitives::Fraction;
//!
//! let a = Fraction::new(1, 4);
//! let b = Fraction::new(2, 8);
//! assert_eq!(a, b);
//! assert_eq!(b.denominator, 8);
//! let sum = a + b;
//! assert_eq!((sum.numerator, sum.denominator), (1, 2));
//! assert_eq!(Fraction::NONE.to01(), 0.0);
//! ```

use std::{
    cmp::Ordering,
    fmt::Display,
    ops::{Add, Div, Mul, Sub},
    str::FromStr,
};

use gcd::Gcd;
use serde::{Deserialize, Serialize};

use crate::error::{FractionError, FractionResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Fraction {
    pub numerator: i64,
    pub denominator: i64,
}

impl Fraction {
    /// Marks an unset fraction. Compares unequal to everything.
    pub const NONE: Self = Self {
        numerator: 0,
        denominator: 0,
    };
    pub const ZERO: Self = Self {
        numerator: 0,
        denominator: 1,
    };

    pub const fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Same as [`Fraction::new`], but refuses a zero denominator.
    pub fn checked(numerator: i64, denominator: i64) -> FractionResult<Self> {
        if denominator == 0 {
            return Err(FractionError::ZeroDenominator(format!(
                "{}/{}",
                numerator, denominator
            )));
        }
        Ok(Self::new(numerator, denominator))
    }

    /// Parse user input like `3/4`, `2` or `0.375`.
    ///
    /// ```
    /// use note_editor::primitives::Fraction;
    ///
    /// let f = Fraction::parse("6/8").unwrap();
    /// assert_eq!((f.numerator, f.denominator), (6, 8));
    /// assert_eq!(Fraction::parse("0.375").unwrap(), Fraction::new(3, 8));
    /// assert!(Fraction::parse("1/0").is_err());
    /// ```
    pub fn parse(input: &str) -> FractionResult<Self> {
        let input = input.trim();
        let parse_int = |s: &str| {
            s.trim()
                .parse::<i64>()
                .map_err(|_| FractionError::Parse(input.to_string()))
        };
        if let Some((numerator, denominator)) = input.split_once('/') {
            return Self::checked(
                parse_int(numerator)?,
                parse_int(denominator)?,
            );
        }
        if let Ok(whole) = input.parse::<i64>() {
            return Ok(Self::new(whole, 1));
        }
        let value = input
            .parse::<f64>()
            .map_err(|_| FractionError::Parse(input.to_string()))?;
        Self::from_f64(value)
    }

    /// Exact conversion of a float through [`fraction::Fraction`].
    pub fn from_f64(value: f64) -> FractionResult<Self> {
        if !value.is_finite() {
            return Err(FractionError::NotFinite(value));
        }
        let exact = ::fraction::Fraction::from(value);
        Self::from_exact(&exact)
            .ok_or_else(|| FractionError::Parse(value.to_string()))
    }

    /// Snap a float to the nearest `k / denominator`.
    ///
    /// Non-finite input or a non-positive denominator gives [`Self::NONE`].
    pub fn from_f64_quantized(value: f64, denominator: i64) -> Self {
        if !value.is_finite() || denominator <= 0 {
            return Self::NONE;
        }
        let numerator = (value * denominator as f64).round();
        if numerator.abs() >= i64::MAX as f64 {
            return Self::NONE;
        }
        Self::new(numerator as i64, denominator)
    }

    pub fn from_exact(exact: &::fraction::Fraction) -> Option<Self> {
        let numerator = i64::try_from(*exact.numer()?).ok()?;
        let denominator = i64::try_from(*exact.denom()?).ok()?;
        match exact.sign()? {
            ::fraction::Sign::Plus => Some(Self::new(numerator, denominator)),
            ::fraction::Sign::Minus => {
                Some(Self::new(-numerator, denominator))
            }
        }
    }

    /// Exact representation for comparisons and sums of many fractions.
    ///
    /// `None` for a zero denominator.
    pub fn to_exact(&self) -> Option<::fraction::Fraction> {
        if self.denominator == 0 {
            return None;
        }
        let exact = ::fraction::Fraction::new(
            self.numerator.unsigned_abs(),
            self.denominator.unsigned_abs(),
        );
        match (self.numerator < 0) != (self.denominator < 0) {
            true => Some(-exact),
            false => Some(exact),
        }
    }

    /// Zero denominator, including [`Self::NONE`].
    pub fn is_none(&self) -> bool {
        self.denominator == 0
    }

    pub fn is_valid(&self) -> bool {
        !self.is_none()
    }

    /// Value in floating point. Never NaN: a zero denominator gives `0.0`.
    pub fn to01(&self) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }
        self.numerator as f64 / self.denominator as f64
    }

    pub fn with_numerator(&self, numerator: i64) -> Self {
        Self::new(numerator, self.denominator)
    }

    /// Reduce in place.
    pub fn reduce(&mut self) {
        *self = self.reduced();
    }

    /// Reduced copy with a positive denominator.
    pub fn reduced(&self) -> Self {
        Self::from_wide(self.numerator as i128, self.denominator as i128)
    }

    fn from_wide(numerator: i128, denominator: i128) -> Self {
        if denominator == 0 {
            return Self::NONE;
        }
        let divisor =
            numerator.unsigned_abs().gcd(denominator.unsigned_abs()) as i128;
        let sign = denominator.signum();
        let (numerator, denominator) =
            (sign * numerator / divisor, sign * denominator / divisor);
        match (i64::try_from(numerator), i64::try_from(denominator)) {
            (Ok(numerator), Ok(denominator)) => {
                Self::new(numerator, denominator)
            }
            _ => {
                log::warn!(
                    "fraction {}/{} does not fit into i64",
                    numerator,
                    denominator
                );
                Self::NONE
            }
        }
    }

    fn wide(&self) -> (i128, i128) {
        (self.numerator as i128, self.denominator as i128)
    }

    /// `self + sign * rhs`, falling back to [`Self::NONE`] on overflow.
    fn add_wide(self, rhs: Self, sign: i128) -> Self {
        if self.is_none() || rhs.is_none() {
            return Self::NONE;
        }
        let (a, b) = self.wide();
        let (c, d) = rhs.wide();
        let numerator = (a * d).checked_add(sign * c * b);
        match (numerator, b.checked_mul(d)) {
            (Some(numerator), Some(denominator)) => {
                Self::from_wide(numerator, denominator)
            }
            _ => {
                let op = if sign < 0 { '-' } else { '+' };
                log::warn!("overflow in {} {} {}", self, op, rhs);
                Self::NONE
            }
        }
    }
}

impl Display for Fraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for Fraction {
    type Err = FractionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for Fraction {
    fn eq(&self, other: &Self) -> bool {
        if self.is_none() || other.is_none() {
            return false;
        }
        let (a, b) = self.wide();
        let (c, d) = other.wide();
        a * d == c * b
    }
}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.is_none() || other.is_none() {
            return None;
        }
        let (a, b) = self.reduced().wide();
        let (c, d) = other.reduced().wide();
        Some((a * d).cmp(&(c * b)))
    }
}

impl Add for Fraction {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        self.add_wide(rhs, 1)
    }
}

impl Sub for Fraction {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        self.add_wide(rhs, -1)
    }
}

impl Mul for Fraction {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        if self.is_none() || rhs.is_none() {
            return Self::NONE;
        }
        let (a, b) = self.wide();
        let (c, d) = rhs.wide();
        Self::from_wide(a * c, b * d)
    }
}

impl Div for Fraction {
    type Output = Self;
    /// Division by a zero fraction gives [`Fraction::NONE`].
    fn div(self, rhs: Self) -> Self::Output {
        self * Self::new(rhs.denominator, rhs.numerator)
    }
}

/// Least common multiple of two positive denominators.
pub fn lcm_denominator(a: i64, b: i64) -> i64 {
    let (a, b) = (a.unsigned_abs(), b.unsigned_abs());
    if a == 0 || b == 0 {
        return a.max(b) as i64;
    }
    (a / a.gcd(b) * b) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_construction_keeps_terms() {
        let f = Fraction::new(4, 8);
        assert_eq!((f.numerator, f.denominator), (4, 8));
        assert_eq!(f, Fraction::new(1, 2));
    }

    #[test]
    fn arithmetic_reduces() {
        let f = Fraction::new(1, 6) + Fraction::new(1, 3);
        assert_eq!((f.numerator, f.denominator), (1, 2));
        let f = Fraction::new(2, 3) * Fraction::new(3, 4);
        assert_eq!((f.numerator, f.denominator), (1, 2));
        let f = Fraction::new(1, 2) / Fraction::new(-1, 4);
        assert_eq!((f.numerator, f.denominator), (-2, 1));
        let f = Fraction::new(3, 4) - Fraction::new(1, 4);
        assert_eq!((f.numerator, f.denominator), (1, 2));
    }

    #[test]
    fn extreme_terms_do_not_panic() {
        let max = Fraction::new(i64::MAX, 1);
        let min = Fraction::new(i64::MIN, 1);
        assert!((max + max).is_none());
        assert!((min + min).is_none());
        assert!((min - max).is_none());
        assert_eq!(max - max, Fraction::ZERO);
        assert_eq!(min - min, Fraction::ZERO);
        assert!((max * max).is_none());
        assert!((min / Fraction::new(1, 2)).is_none());
        let tiny = Fraction::new(1, i64::MAX);
        assert_eq!(tiny + tiny, Fraction::new(2, i64::MAX));
    }

    #[test]
    fn none_is_tolerated() {
        assert_eq!(Fraction::NONE.to01(), 0.0);
        assert_eq!(Fraction::new(5, 0).to01(), 0.0);
        assert_ne!(Fraction::NONE, Fraction::NONE);
        assert!((Fraction::NONE + Fraction::new(1, 2)).is_none());
        assert!((Fraction::new(1, 2) / Fraction::ZERO).is_none());
        assert_eq!(Fraction::NONE.partial_cmp(&Fraction::ZERO), None);
    }

    #[test]
    fn ordering() {
        assert!(Fraction::new(1, 3) < Fraction::new(1, 2));
        assert!(Fraction::new(-1, 2) < Fraction::new(1, -3));
        assert!(Fraction::new(3, 4) > Fraction::new(5, 8));
    }

    #[test]
    fn quantize_and_exact() {
        assert_eq!(
            Fraction::from_f64_quantized(0.26, 4),
            Fraction::new(1, 4)
        );
        assert!(Fraction::from_f64_quantized(f64::NAN, 4).is_none());
        assert_eq!(
            Fraction::new(-3, 6).to_exact(),
            Some(-::fraction::Fraction::new(1u64, 2u64))
        );
        assert_eq!(Fraction::NONE.to_exact(), None);
        assert_eq!(Fraction::from_f64(-0.75), Ok(Fraction::new(-3, 4)));
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            Fraction::parse("3/0"),
            Err(FractionError::ZeroDenominator("3/0".to_string()))
        );
        assert!(matches!(
            Fraction::parse("three"),
            Err(FractionError::Parse(_))
        ));
        assert_eq!(Fraction::parse(" 7 ").unwrap(), Fraction::new(7, 1));
    }

    #[test]
    fn lcm() {
        assert_eq!(lcm_denominator(4, 6), 12);
        assert_eq!(lcm_denominator(8, 4), 8);
        assert_eq!(lcm_denominator(0, 3), 3);
    }
}
