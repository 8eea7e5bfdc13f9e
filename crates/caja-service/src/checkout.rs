//! # Sale Finalization
//!
//! Turns a priced cart into an immutable sale record and decrements stock.
//!
//! ## Ordering
//! ```text
//!  guard (empty cart)          pure, no collaborator touched on failure
//!        │
//!        ▼
//!  price cart                  subtotal − discounts, clamped at zero
//!        │
//!        ▼
//!  decrement stock (batch)     all-or-nothing; a conflict commits nothing
//!        │
//!        ▼
//!  record sale                 on failure the decrement is compensated
//!        │
//!        ▼
//!  consume suspension link     resumed ticket leaves the pending set
//! ```
//!
//! Stock moves before the record is written so an oversell can never be
//! persisted; the compensation path restores the decrement if the recorder
//! fails afterwards.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use caja_core::{Cart, CoreError, DiscountState, PaymentMethod, Sale, SaleLine};

use crate::error::{ServiceError, ServiceResult};
use crate::ports::{SaleDraft, SaleRecorder, StockDecrement, StockLedger, SuspensionBackend};

/// Finalizes carts into sales. Stateless; all state lives behind the ports.
pub struct SaleFinalizer {
    ledger: Arc<dyn StockLedger>,
    recorder: Arc<dyn SaleRecorder>,
    suspensions: Arc<dyn SuspensionBackend>,
}

impl SaleFinalizer {
    pub fn new(
        ledger: Arc<dyn StockLedger>,
        recorder: Arc<dyn SaleRecorder>,
        suspensions: Arc<dyn SuspensionBackend>,
    ) -> Self {
        SaleFinalizer {
            ledger,
            recorder,
            suspensions,
        }
    }

    /// Finalizes `cart` under `discounts` into an immutable [`Sale`].
    ///
    /// `suspended_sale_id` carries the provenance ticket when the cart was
    /// resumed; the suspension record is consumed on success so the ticket
    /// cannot be resumed again.
    pub async fn finalize(
        &self,
        cart: &Cart,
        discounts: &DiscountState,
        payment_method: PaymentMethod,
        suspended_sale_id: Option<String>,
        note: Option<String>,
    ) -> ServiceResult<Sale> {
        if cart.is_empty() {
            return Err(ServiceError::Core(CoreError::EmptyCart));
        }

        let pricing = discounts.pricing(cart.subtotal());
        let lines: Vec<SaleLine> = cart
            .lines()
            .iter()
            .map(|line| SaleLine {
                article_id: line.article_id.clone(),
                title: line.title.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
                line_total: line.line_total(),
            })
            .collect();

        let decrements: Vec<StockDecrement> = cart
            .lines()
            .iter()
            .map(|line| StockDecrement {
                article_id: line.article_id.clone(),
                quantity: line.quantity,
            })
            .collect();

        self.ledger.decrement_batch(&decrements).await?;

        let draft = SaleDraft {
            lines: lines.clone(),
            pricing: pricing.clone(),
            payment_method,
            note: note.clone(),
            suspended_sale_id: suspended_sale_id.clone(),
        };
        let receipt = match self.recorder.create(draft).await {
            Ok(receipt) => receipt,
            Err(e) => {
                // The decrement committed but the sale did not: put the
                // stock back before surfacing the failure.
                for decrement in &decrements {
                    if let Err(comp) = self
                        .ledger
                        .adjust(&decrement.article_id, decrement.quantity)
                        .await
                    {
                        warn!(
                            article_id = %decrement.article_id,
                            error = %comp,
                            "stock compensation failed after recorder error"
                        );
                    }
                }
                return Err(e);
            }
        };

        if let Some(ticket) = &suspended_sale_id {
            // Already-gone tickets are fine (deleted from another register);
            // a backend outage here must not fail the committed sale.
            match self.suspensions.delete(ticket).await {
                Ok(true) => debug!(ticket, "suspension consumed at finalize"),
                Ok(false) => debug!(ticket, "suspension already gone at finalize"),
                Err(e) => warn!(ticket, error = %e, "failed to consume suspension"),
            }
        }

        info!(
            sale_id = %receipt.sale_id,
            ticket = %receipt.ticket_number,
            total = %pricing.total,
            "sale finalized"
        );

        Ok(Sale {
            id: receipt.sale_id,
            ticket_number: receipt.ticket_number,
            lines,
            payment_method,
            subtotal: pricing.subtotal,
            discount_total: pricing.discount_total,
            total: pricing.total,
            note,
            suspended_sale_id,
            created_at: Utc::now(),
        })
    }

    /// Edits the note on an already-recorded sale.
    pub async fn set_note(&self, sale_id: &str, note: Option<String>) -> ServiceResult<()> {
        self.recorder.set_note(sale_id, note).await
    }
}
