//! # Quantity Module
//!
//! Fixed-point quantities with a minimum granularity of 0.001.
//!
//! Unit-type articles sell whole pieces; weight-type articles sell fractional
//! amounts (e.g. kilograms). Both are represented as thousandths of a unit in
//! an i64, so quantity arithmetic and stock comparisons stay exact.
//!
//! Whether a quantity must be integral is a property of the article's unit
//! type, owned by the catalog. The cart does not enforce it; callers step by
//! 1 for unit articles and by arbitrary positive increments for weight
//! articles, and can use [`Quantity::is_integral`] to validate input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

/// How an article is measured and sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    /// Discrete pieces; quantities are positive integers.
    Unit,
    /// Sold by weight; quantities are positive reals down to 0.001.
    Weight,
}

/// A quantity in thousandths of a unit.
///
/// Signed: count differences (`physical - system`) can be negative.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, Default,
)]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    /// Thousandths per whole unit (the 0.001 granularity floor).
    pub const SCALE: i64 = 1000;

    /// Creates a quantity from thousandths of a unit.
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Quantity(millis)
    }

    /// Creates a quantity from whole units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * Self::SCALE)
    }

    /// Creates a quantity from a real value, rounding to the nearest
    /// thousandth. Returns `None` for non-finite input.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Some(Quantity((value * Self::SCALE as f64).round() as i64))
    }

    #[inline]
    pub const fn millis(&self) -> i64 {
        self.0
    }

    /// Real-valued representation, for display and stats only.
    #[inline]
    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    /// One whole unit.
    #[inline]
    pub const fn one() -> Self {
        Quantity(Self::SCALE)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// True when the quantity is a whole number of units.
    #[inline]
    pub const fn is_integral(&self) -> bool {
        self.0 % Self::SCALE == 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Quantity(self.0.abs())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integral() {
            write!(f, "{}", self.0 / Self::SCALE)
        } else {
            let sign = if self.0 < 0 { "-" } else { "" };
            let abs = self.0.abs();
            let frac = format!("{:03}", abs % Self::SCALE);
            write!(f, "{}{}.{}", sign, abs / Self::SCALE, frac.trim_end_matches('0'))
        }
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(-self.0)
    }
}

impl std::iter::Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), |acc, q| acc + q)
    }
}
