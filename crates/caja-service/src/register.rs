//! # Register Session
//!
//! One active cashier session per register: the in-progress cart, its
//! discounts, and the durability/re-pricing choreography around every
//! mutation.
//!
//! ## Mutation Flow
//! ```text
//!  user action ──► lock state ──► cart mutation (caja-core, all-or-nothing)
//!                                       │ success
//!                                       ▼
//!                              persist cart (CartStore)
//!                                       │
//!                                       ▼
//!                         re-evaluate promotions (one call)
//! ```
//!
//! Promotion re-evaluation is speculative: the evaluator's latest completed
//! result replaces the active set wholesale, a failed evaluation keeps the
//! previous set, and emptying the cart drops both discount channels. The
//! state lock serializes mutations, so "most recent completed call wins"
//! holds without extra coordination.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use caja_core::{
    Cart, CartLine, CartPricing, DiscountState, DiscountValue, ManualDiscount, PaymentMethod,
    PromotionApplication, Quantity, Sale, SuspendedSale,
};

use crate::checkout::SaleFinalizer;
use crate::error::{ServiceError, ServiceResult};
use crate::ports::{CartStore, PromotionEvaluator, PromotionLine, StockLedger};
use crate::suspension::SuspensionService;

/// Snapshot of the register handed back after every operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub pricing: CartPricing,
    pub manual_discount: Option<ManualDiscount>,
    pub promotions: Vec<PromotionApplication>,
    /// Ticket of the suspended sale this cart resumed, if any.
    pub resumed_from: Option<String>,
}

struct RegisterState {
    cart: Cart,
    discounts: DiscountState,
    resumed_from: Option<String>,
}

impl RegisterState {
    fn view(&self) -> CartView {
        CartView {
            lines: self.cart.snapshot(),
            pricing: self.discounts.pricing(self.cart.subtotal()),
            manual_discount: self.discounts.manual().cloned(),
            promotions: self.discounts.promotions().to_vec(),
            resumed_from: self.resumed_from.clone(),
        }
    }
}

/// The register session. One per physical register; operations serialize on
/// an internal lock.
pub struct RegisterSession {
    ledger: Arc<dyn StockLedger>,
    evaluator: Arc<dyn PromotionEvaluator>,
    cart_store: Arc<dyn CartStore>,
    state: Mutex<RegisterState>,
}

impl RegisterSession {
    pub fn new(
        ledger: Arc<dyn StockLedger>,
        evaluator: Arc<dyn PromotionEvaluator>,
        cart_store: Arc<dyn CartStore>,
    ) -> Self {
        RegisterSession {
            ledger,
            evaluator,
            cart_store,
            state: Mutex::new(RegisterState {
                cart: Cart::new(),
                discounts: DiscountState::new(),
                resumed_from: None,
            }),
        }
    }

    /// Current register snapshot. Read-only.
    pub async fn view(&self) -> CartView {
        self.state.lock().await.view()
    }

    /// Adds an article to the cart by id, against a fresh catalog snapshot.
    pub async fn add_line(&self, article_id: &str, quantity: Quantity) -> ServiceResult<CartView> {
        debug!(article_id, %quantity, "add_line");

        let article = self
            .ledger
            .article(article_id)
            .await?
            .filter(|a| a.is_active)
            .ok_or_else(|| ServiceError::ArticleNotFound {
                id: article_id.to_string(),
            })?;

        let mut state = self.state.lock().await;
        state.cart.add_line(&article, quantity)?;
        self.after_mutation(&mut state).await?;
        Ok(state.view())
    }

    /// Sets a line's quantity; `<= 0` removes the line. A stock violation
    /// leaves the line unchanged.
    pub async fn set_quantity(&self, index: usize, quantity: Quantity) -> ServiceResult<CartView> {
        debug!(index, %quantity, "set_quantity");

        let mut state = self.state.lock().await;
        state.cart.set_quantity(index, quantity)?;
        self.after_mutation(&mut state).await?;
        Ok(state.view())
    }

    /// Removes the line at `index` (out of range is a no-op).
    pub async fn remove_line(&self, index: usize) -> ServiceResult<CartView> {
        debug!(index, "remove_line");

        let mut state = self.state.lock().await;
        state.cart.remove_line(index);
        self.after_mutation(&mut state).await?;
        Ok(state.view())
    }

    /// Empties the cart and drops both discount channels.
    pub async fn clear(&self) -> ServiceResult<CartView> {
        debug!("clear cart");

        let mut state = self.state.lock().await;
        state.cart.clear();
        state.resumed_from = None;
        self.after_mutation(&mut state).await?;
        Ok(state.view())
    }

    /// Applies a manual discount, validated against the current subtotal.
    /// At most one at a time; remove the current one first.
    pub async fn apply_manual_discount(
        &self,
        value: DiscountValue,
        description: impl Into<String>,
    ) -> ServiceResult<CartView> {
        let mut state = self.state.lock().await;
        let subtotal = state.cart.subtotal();
        state.discounts.apply_manual(value, description, subtotal)?;
        info!(%subtotal, "manual discount applied");
        Ok(state.view())
    }

    /// Removes the manual discount. Pure local mutation, no recomputation.
    pub async fn remove_manual_discount(&self) -> ServiceResult<CartView> {
        let mut state = self.state.lock().await;
        state.discounts.remove_manual();
        Ok(state.view())
    }

    /// Drops all promotions. Pure local mutation; the next cart change
    /// re-evaluates.
    pub async fn clear_promotions(&self) -> ServiceResult<CartView> {
        let mut state = self.state.lock().await;
        state.discounts.clear_promotions();
        Ok(state.view())
    }

    /// Explicit promotion check on user request.
    ///
    /// Short-circuits when promotions are already applied: the current state
    /// is shown rather than re-evaluated. With none applied, evaluates once
    /// and surfaces evaluator failures (unlike the speculative path).
    pub async fn check_promotions(&self) -> ServiceResult<CartView> {
        let mut state = self.state.lock().await;
        if state.cart.is_empty() {
            return Err(ServiceError::Core(caja_core::CoreError::EmptyCart));
        }
        if state.discounts.has_promotions() {
            debug!("promotions already applied; showing current state");
            return Ok(state.view());
        }

        let lines: Vec<PromotionLine> = state.cart.lines().iter().map(PromotionLine::from).collect();
        let promotions = self.evaluator.evaluate(&lines).await?;
        info!(count = promotions.len(), "promotions applied");
        state.discounts.set_promotions(promotions);
        Ok(state.view())
    }

    /// Parks the cart as a suspended sale and detaches it from the register.
    ///
    /// Fails with `EmptyCart` before touching the store. On success the cart,
    /// discounts and provenance are cleared.
    pub async fn suspend(
        &self,
        suspensions: &SuspensionService,
        note: Option<String>,
    ) -> ServiceResult<SuspendedSale> {
        let mut state = self.state.lock().await;
        let suspended = suspensions.suspend(state.cart.snapshot(), note).await?;

        state.cart.clear();
        state.discounts.clear();
        state.resumed_from = None;
        self.persist(&state).await?;

        info!(ticket = %suspended.ticket, "sale suspended");
        Ok(suspended)
    }

    /// Reinstates a resumed suspended sale 1:1, replacing the current cart.
    ///
    /// Line prices are the ones frozen at suspension time; they are not
    /// re-validated against the current catalog. Records the ticket as
    /// provenance so finalize consumes the suspension linkage.
    pub async fn restore(&self, suspended: SuspendedSale) -> ServiceResult<CartView> {
        let mut state = self.state.lock().await;
        state.cart = Cart::from_lines(suspended.lines);
        state.discounts.clear();
        state.resumed_from = Some(suspended.ticket.clone());
        self.after_mutation(&mut state).await?;

        info!(ticket = %suspended.ticket, "suspended sale restored");
        Ok(state.view())
    }

    /// Finalizes the current cart into an immutable sale.
    ///
    /// Delegates to the finalizer (empty-cart guard, pricing, all-or-nothing
    /// stock decrement, provenance consumption), then clears the register
    /// state only after success.
    pub async fn checkout(
        &self,
        finalizer: &SaleFinalizer,
        payment_method: PaymentMethod,
        note: Option<String>,
    ) -> ServiceResult<Sale> {
        let mut state = self.state.lock().await;
        let sale = finalizer
            .finalize(
                &state.cart,
                &state.discounts,
                payment_method,
                state.resumed_from.clone(),
                note,
            )
            .await?;

        state.cart.clear();
        state.discounts.clear();
        state.resumed_from = None;
        // The sale is already committed; a persist hiccup here must not fail
        // the checkout.
        if let Err(e) = self.persist(&state).await {
            warn!(error = %e, "failed to persist cleared cart after checkout");
        }

        Ok(sale)
    }

    /// Durability + speculative re-pricing after a successful cart mutation.
    async fn after_mutation(&self, state: &mut RegisterState) -> ServiceResult<()> {
        self.persist(state).await?;
        self.refresh_promotions(state).await;
        Ok(())
    }

    async fn persist(&self, state: &RegisterState) -> ServiceResult<()> {
        self.cart_store.persist(state.cart.lines()).await
    }

    /// One speculative evaluation per mutation. Last completed result wins;
    /// a failure keeps the previous set; an empty cart drops both channels.
    async fn refresh_promotions(&self, state: &mut RegisterState) {
        if state.cart.is_empty() {
            state.discounts.clear();
            return;
        }

        let lines: Vec<PromotionLine> = state.cart.lines().iter().map(PromotionLine::from).collect();
        match self.evaluator.evaluate(&lines).await {
            Ok(promotions) => state.discounts.set_promotions(promotions),
            Err(e) => warn!(error = %e, "promotion evaluation failed; keeping previous set"),
        }
    }
}
