//! # Discounts and Promotions
//!
//! Two independent discount channels that compose additively, never
//! multiplicatively:
//!
//! 1. **Manual discount** — entered by staff, validated against the current
//!    subtotal. At most one per cart; it must be removed explicitly before
//!    another can be applied.
//! 2. **Promotions** — computed by an external evaluator from a cart
//!    snapshot. The whole set is replaced with whatever the evaluator
//!    returned on each re-evaluation; sets are never merged across calls.
//!
//! `total = max(0, subtotal - manual - sum(promotions))`. The clamp to zero
//! is a hard invariant: the total is never negative regardless of combined
//! discount overshoot.
//!
//! Removing the manual discount or all promotions is a pure local mutation;
//! previously computed values are trusted until the next cart mutation
//! triggers a re-evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Manual Discount
// =============================================================================

/// The value of a manual discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum DiscountValue {
    /// Percentage of the subtotal, in basis points (1000 = 10%).
    /// Valid range (0, 10000].
    Percentage(u32),
    /// Fixed amount off the subtotal. Valid range (0, subtotal].
    FixedAmount(Money),
}

/// A staff-entered discount on the whole cart.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ManualDiscount {
    pub value: DiscountValue,
    /// Human-readable description, e.g. "Descuento 10%".
    pub description: String,
    #[ts(as = "String")]
    pub applied_at: DateTime<Utc>,
}

impl ManualDiscount {
    /// Discount amount for the given subtotal.
    pub fn amount(&self, subtotal: Money) -> Money {
        match self.value {
            DiscountValue::Percentage(bps) => subtotal.percentage_amount(bps),
            DiscountValue::FixedAmount(amount) => amount,
        }
    }
}

// =============================================================================
// Promotion Application
// =============================================================================

/// One promotion the external evaluator found applicable to the cart.
///
/// The evaluation arithmetic is a black box; the core only applies the
/// estimated discount deterministically.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PromotionApplication {
    pub promotion_id: String,
    pub name: String,
    /// Estimated discount, >= 0 by evaluator contract.
    pub estimated_discount: Money,
    /// Articles the promotion applies to; empty means the whole cart.
    pub affected_article_ids: Vec<String>,
}

// =============================================================================
// Discount State
// =============================================================================

/// Derived pricing for a cart under the current discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartPricing {
    pub subtotal: Money,
    pub manual_discount: Money,
    pub promotion_discount: Money,
    pub discount_total: Money,
    /// Clamped: never negative.
    pub total: Money,
}

/// The discounts currently attached to a cart: at most one manual discount
/// plus zero-or-more promotions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DiscountState {
    manual: Option<ManualDiscount>,
    promotions: Vec<PromotionApplication>,
}

impl DiscountState {
    pub fn new() -> Self {
        DiscountState::default()
    }

    pub fn manual(&self) -> Option<&ManualDiscount> {
        self.manual.as_ref()
    }

    pub fn promotions(&self) -> &[PromotionApplication] {
        &self.promotions
    }

    pub fn has_promotions(&self) -> bool {
        !self.promotions.is_empty()
    }

    /// Applies a manual discount after validating it against the subtotal.
    ///
    /// ## Errors
    /// - `DiscountAlreadyApplied` when one is present (remove it first)
    /// - `InvalidDiscountValue` for a percentage outside (0, 100] or a
    ///   fixed amount outside (0, subtotal]
    pub fn apply_manual(
        &mut self,
        value: DiscountValue,
        description: impl Into<String>,
        subtotal: Money,
    ) -> CoreResult<()> {
        if self.manual.is_some() {
            return Err(CoreError::DiscountAlreadyApplied);
        }

        match value {
            DiscountValue::Percentage(bps) => {
                if bps == 0 || bps > 10_000 {
                    return Err(CoreError::InvalidDiscountValue {
                        reason: format!("percentage must be in (0, 100], got {}", bps as f64 / 100.0),
                    });
                }
            }
            DiscountValue::FixedAmount(amount) => {
                if !amount.is_positive() {
                    return Err(CoreError::InvalidDiscountValue {
                        reason: format!("fixed amount must be positive, got {amount}"),
                    });
                }
                if amount > subtotal {
                    return Err(CoreError::InvalidDiscountValue {
                        reason: format!("fixed amount {amount} exceeds subtotal {subtotal}"),
                    });
                }
            }
        }

        self.manual = Some(ManualDiscount {
            value,
            description: description.into(),
            applied_at: Utc::now(),
        });
        Ok(())
    }

    /// Removes the manual discount, returning it. Pure local mutation.
    pub fn remove_manual(&mut self) -> Option<ManualDiscount> {
        self.manual.take()
    }

    /// Replaces the active promotion set wholesale with the evaluator's
    /// latest result. Never merges with the previous set.
    pub fn set_promotions(&mut self, promotions: Vec<PromotionApplication>) {
        self.promotions = promotions;
    }

    /// Drops all promotions. Pure local mutation.
    pub fn clear_promotions(&mut self) {
        self.promotions.clear();
    }

    /// Drops both channels (cart emptied or sale completed).
    pub fn clear(&mut self) {
        self.manual = None;
        self.promotions.clear();
    }

    /// Sum of promotion discounts.
    pub fn promotion_discount(&self) -> Money {
        self.promotions.iter().map(|p| p.estimated_discount).sum()
    }

    /// Derives the full pricing for the given subtotal.
    pub fn pricing(&self, subtotal: Money) -> CartPricing {
        let manual_discount = self
            .manual
            .as_ref()
            .map(|d| d.amount(subtotal))
            .unwrap_or_default();
        let promotion_discount = self.promotion_discount();
        let discount_total = manual_discount + promotion_discount;

        CartPricing {
            subtotal,
            manual_discount,
            promotion_discount,
            discount_total,
            total: (subtotal - discount_total).clamped_non_negative(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn promo(id: &str, discount_cents: i64) -> PromotionApplication {
        PromotionApplication {
            promotion_id: id.to_string(),
            name: format!("Promo {}", id),
            estimated_discount: Money::from_cents(discount_cents),
            affected_article_ids: Vec::new(),
        }
    }

    /// 10% on subtotal 200 -> 180; a 50-unit promotion on top
    /// -> max(0, 200 - 20 - 50) = 130.
    #[test]
    fn test_manual_then_promotion_compose_additively() {
        let subtotal = Money::from_cents(20000);
        let mut state = DiscountState::new();

        state
            .apply_manual(DiscountValue::Percentage(1000), "Descuento 10%", subtotal)
            .unwrap();
        assert_eq!(state.pricing(subtotal).total.cents(), 18000);

        state.set_promotions(vec![promo("p1", 5000)]);
        let pricing = state.pricing(subtotal);
        assert_eq!(pricing.manual_discount.cents(), 2000);
        assert_eq!(pricing.promotion_discount.cents(), 5000);
        assert_eq!(pricing.total.cents(), 13000);
    }

    /// Subtotal 100, fixed 80, promotion 50 -> total 0, not -30.
    #[test]
    fn test_total_clamped_to_zero() {
        let subtotal = Money::from_cents(10000);
        let mut state = DiscountState::new();

        state
            .apply_manual(
                DiscountValue::FixedAmount(Money::from_cents(8000)),
                "Descuento $80",
                subtotal,
            )
            .unwrap();
        state.set_promotions(vec![promo("p1", 5000)]);

        let pricing = state.pricing(subtotal);
        assert_eq!(pricing.discount_total.cents(), 13000);
        assert_eq!(pricing.total, Money::zero());
    }

    #[test]
    fn test_second_manual_discount_rejected() {
        let subtotal = Money::from_cents(10000);
        let mut state = DiscountState::new();

        state
            .apply_manual(DiscountValue::Percentage(500), "5%", subtotal)
            .unwrap();
        let err = state
            .apply_manual(DiscountValue::Percentage(1000), "10%", subtotal)
            .unwrap_err();
        assert!(matches!(err, CoreError::DiscountAlreadyApplied));

        // Explicit removal frees the slot
        state.remove_manual().unwrap();
        state
            .apply_manual(DiscountValue::Percentage(1000), "10%", subtotal)
            .unwrap();
    }

    #[test]
    fn test_percentage_bounds() {
        let subtotal = Money::from_cents(10000);
        let mut state = DiscountState::new();

        let err = state
            .apply_manual(DiscountValue::Percentage(0), "0%", subtotal)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidDiscountValue { .. }));

        let err = state
            .apply_manual(DiscountValue::Percentage(10_001), "100.01%", subtotal)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidDiscountValue { .. }));

        // 100% exactly is allowed
        state
            .apply_manual(DiscountValue::Percentage(10_000), "100%", subtotal)
            .unwrap();
        assert_eq!(state.pricing(subtotal).total, Money::zero());
    }

    #[test]
    fn test_fixed_amount_bounds() {
        let subtotal = Money::from_cents(5000);
        let mut state = DiscountState::new();

        let err = state
            .apply_manual(
                DiscountValue::FixedAmount(Money::from_cents(5001)),
                "too big",
                subtotal,
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidDiscountValue { .. }));

        let err = state
            .apply_manual(DiscountValue::FixedAmount(Money::zero()), "zero", subtotal)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidDiscountValue { .. }));

        // Subtotal exactly is allowed
        state
            .apply_manual(
                DiscountValue::FixedAmount(subtotal),
                "full subtotal",
                subtotal,
            )
            .unwrap();
    }

    #[test]
    fn test_promotions_replaced_wholesale() {
        let mut state = DiscountState::new();

        state.set_promotions(vec![promo("p1", 100), promo("p2", 200)]);
        assert_eq!(state.promotion_discount().cents(), 300);

        // A new evaluation replaces the set; p1/p2 are not retained
        state.set_promotions(vec![promo("p3", 50)]);
        assert_eq!(state.promotions().len(), 1);
        assert_eq!(state.promotion_discount().cents(), 50);

        state.set_promotions(Vec::new());
        assert!(!state.has_promotions());
    }

    #[test]
    fn test_clear_drops_both_channels() {
        let subtotal = Money::from_cents(10000);
        let mut state = DiscountState::new();
        state
            .apply_manual(DiscountValue::Percentage(1000), "10%", subtotal)
            .unwrap();
        state.set_promotions(vec![promo("p1", 100)]);

        state.clear();
        assert!(state.manual().is_none());
        assert!(!state.has_promotions());
        assert_eq!(state.pricing(subtotal).total, subtotal);
    }
}
