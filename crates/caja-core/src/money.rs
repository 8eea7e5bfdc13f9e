//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  In floating point: 0.1 + 0.2 = 0.30000000000000004                     │
//! │                                                                         │
//! │  OUR SOLUTION: integer cents (i64)                                      │
//! │    Prices, discounts and totals are exact.                              │
//! │                                                                         │
//! │  Weight articles sell fractional quantities, so a line total can land   │
//! │  between two cents. Those are accumulated exactly in MILLI-CENTS        │
//! │  (i128) and converted to Money once, at the subtotal boundary.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: discounts and count differences can be negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts an exact milli-cent amount to Money, rounding half away
    /// from zero. This is the single rounding point for fractional-quantity
    /// line totals.
    pub fn from_millicents(millicents: i128) -> Self {
        let rounded = if millicents >= 0 {
            (millicents + 500) / 1000
        } else {
            (millicents - 500) / 1000
        };
        Money(rounded as i64)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value in milli-cents (for exact line-total accumulation).
    #[inline]
    pub const fn millicents(&self) -> i128 {
        self.0 as i128 * 1000
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
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

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative values to zero.
    ///
    /// Totals are never negative regardless of combined discount overshoot;
    /// this is the hard invariant behind `max(0, subtotal - discounts)`.
    #[inline]
    pub const fn clamped_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Returns the given percentage of this amount, expressed in basis
    /// points (1 bps = 0.01%, so 1000 bps = 10%).
    ///
    /// Uses integer math with half-up rounding: `(amount * bps + 5000) / 10000`.
    /// i128 widening prevents overflow on large amounts.
    pub fn percentage_amount(&self, bps: u32) -> Money {
        let amount = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money(amount as i64)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by an integer quantity (unit articles).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}
