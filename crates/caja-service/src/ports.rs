//! # Collaborator Ports
//!
//! Boundary contracts the transaction core consumes. The far side of each
//! port (database, pricing service, server-side session store) is out of
//! scope; adapters implement these traits. Reference in-memory adapters with
//! the contractual semantics live in [`crate::memory`].
//!
//! Every stock-touching call is fallible and retry-free: a failed or
//! timed-out call is a no-op on local state, and the retry decision belongs
//! to the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use caja_core::{
    Article, CartLine, CartPricing, CountSnapshotEntry, Money, PaymentMethod, PromotionApplication,
    Quantity, SaleLine, SuspendedSale,
};

use crate::error::ServiceResult;

// =============================================================================
// Stock Ledger
// =============================================================================

/// One article's share of a finalize-time batch decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDecrement {
    pub article_id: String,
    pub quantity: Quantity,
}

/// Source of truth for per-article available quantity.
///
/// The ledger owns atomicity: decrements are compare-and-decrement (fail
/// rather than go negative), and a batch either commits for every line or
/// for none.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Fetches a catalog snapshot of one article.
    async fn article(&self, article_id: &str) -> ServiceResult<Option<Article>>;

    /// Decrements stock for every entry, all-or-nothing. A conflict on any
    /// entry fails the whole batch with `StockConflict` and commits nothing.
    async fn decrement_batch(&self, decrements: &[StockDecrement]) -> ServiceResult<()>;

    /// Applies a signed stock correction (physical-count adjustment).
    async fn adjust(&self, article_id: &str, delta: Quantity) -> ServiceResult<()>;

    /// Snapshots every active article's system quantity for a count session.
    async fn snapshot_for_count(&self) -> ServiceResult<Vec<CountSnapshotEntry>>;
}

// =============================================================================
// Promotion Evaluator
// =============================================================================

/// The cart snapshot handed to the promotion evaluator: line items only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionLine {
    pub article_id: String,
    pub title: String,
    pub unit_price: Money,
    pub quantity: Quantity,
}

impl From<&CartLine> for PromotionLine {
    fn from(line: &CartLine) -> Self {
        PromotionLine {
            article_id: line.article_id.clone(),
            title: line.title.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
        }
    }
}

/// External pricing service that computes applicable promotions.
///
/// Read-only and side-effect-free from the core's perspective; calls may be
/// issued speculatively on every cart mutation, and the most recent
/// completed call's result wins.
#[async_trait]
pub trait PromotionEvaluator: Send + Sync {
    async fn evaluate(&self, lines: &[PromotionLine]) -> ServiceResult<Vec<PromotionApplication>>;
}

// =============================================================================
// Suspension Backend
// =============================================================================

/// Durable side-table of suspended carts keyed by ticket.
#[async_trait]
pub trait SuspensionBackend: Send + Sync {
    /// Stores a cart snapshot and returns the full record with its ticket.
    async fn persist(
        &self,
        lines: Vec<CartLine>,
        note: Option<String>,
    ) -> ServiceResult<SuspendedSale>;

    /// Atomic remove-and-return. `None` when the ticket does not exist; two
    /// concurrent pops of the same ticket cannot both return the record.
    async fn pop(&self, ticket: &str) -> ServiceResult<Option<SuspendedSale>>;

    /// Removes without resuming. Returns whether a record existed.
    async fn delete(&self, ticket: &str) -> ServiceResult<bool>;

    /// All pending suspensions, most recent first. Read-only.
    async fn list(&self) -> ServiceResult<Vec<SuspendedSale>>;
}

// =============================================================================
// Sale Recorder
// =============================================================================

/// Everything the recorder needs to persist a finalized sale.
#[derive(Debug, Clone)]
pub struct SaleDraft {
    pub lines: Vec<SaleLine>,
    pub pricing: CartPricing,
    pub payment_method: PaymentMethod,
    pub note: Option<String>,
    /// Provenance link when the sale resumed a suspended ticket.
    pub suspended_sale_id: Option<String>,
}

/// Identifiers assigned by the recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleReceipt {
    pub sale_id: String,
    /// Human-readable ticket number; format and uniqueness are the
    /// recorder's concern.
    pub ticket_number: String,
}

/// Collaborator that persists immutable sale records.
#[async_trait]
pub trait SaleRecorder: Send + Sync {
    async fn create(&self, draft: SaleDraft) -> ServiceResult<SaleReceipt>;

    /// Edits a sale's note after the fact. Whether (and for how long) a sale
    /// stays note-mutable is the recorder's policy.
    async fn set_note(&self, sale_id: &str, note: Option<String>) -> ServiceResult<()>;
}

// =============================================================================
// Cart Store
// =============================================================================

/// Durability surface for the in-progress cart.
///
/// The register's contract is "mutate in memory, then durably persist" on
/// every successful mutation, independent of the storage medium (device
/// store, server-side session, database row).
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn persist(&self, lines: &[CartLine]) -> ServiceResult<()>;
}
