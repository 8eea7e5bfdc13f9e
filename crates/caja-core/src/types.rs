//! # Domain Types
//!
//! Core domain types for the transaction core.
//!
//! ## Snapshot Pattern
//! The catalog owns articles; the core only reads a per-operation snapshot.
//! Everything that outlives the moment it was priced — cart lines, suspended
//! sales, finalized sales — carries frozen copies of title and unit price so
//! later catalog edits never rewrite history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::quantity::{Quantity, UnitType};

// =============================================================================
// Article
// =============================================================================

/// A catalog article as seen by the transaction core: a read-only snapshot
/// taken at the moment of an operation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Unique identifier.
    pub id: String,

    /// Display title shown to the cashier and on the ticket.
    pub title: String,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: Option<String>,

    /// Unit price in integer currency units.
    pub unit_price: Money,

    /// Available stock. Fractional for weight articles, whole for unit
    /// articles; never negative on the ledger side.
    pub stock: Quantity,

    /// How the article is measured and sold.
    pub unit_type: UnitType,

    /// Profit margin per unit, when the catalog tracks it.
    pub cost_margin: Option<Money>,

    /// Whether the article is active (soft delete on the catalog side).
    pub is_active: bool,
}

impl Article {
    /// Cost price derived from the margin, when known.
    pub fn cost_price(&self) -> Option<Money> {
        self.cost_margin.map(|margin| self.unit_price - margin)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on an external terminal.
    Card,
}

// =============================================================================
// Sale
// =============================================================================

/// A line in a finalized sale. Prices and titles are frozen at sale time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub article_id: String,
    /// Title at time of sale (frozen).
    pub title: String,
    /// Unit price at time of sale (frozen).
    pub unit_price: Money,
    pub quantity: Quantity,
    /// Line total (`unit_price x quantity`), rounded once per line.
    pub line_total: Money,
}

/// A finalized, immutable sale record.
///
/// Created only by the finalizer after the stock decrement committed; never
/// mutated afterwards except for the note, which the recorder may edit under
/// its own policy.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    /// Human-readable ticket number, assigned by the sale recorder.
    pub ticket_number: String,
    pub lines: Vec<SaleLine>,
    pub payment_method: PaymentMethod,
    pub subtotal: Money,
    pub discount_total: Money,
    /// `max(0, subtotal - discount_total)`.
    pub total: Money,
    pub note: Option<String>,
    /// Provenance link when this sale resumed a suspended ticket.
    pub suspended_sale_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Suspended Sale
// =============================================================================

/// A parked cart, keyed by an opaque ticket.
///
/// Created by suspending a non-empty cart and consumed exactly once: either
/// resumed (removing it from the store) or explicitly deleted. Never mutated
/// in place. Line prices stay frozen at suspension time; resume hands them
/// back verbatim without re-validating against the current catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SuspendedSale {
    /// Ticket identifier, e.g. `SUSP-1A2B3C4D`.
    pub ticket: String,
    pub lines: Vec<crate::cart::CartLine>,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub suspended_at: DateTime<Utc>,
}

impl SuspendedSale {
    /// Subtotal of the parked lines, for listings.
    pub fn total(&self) -> Money {
        Money::from_millicents(self.lines.iter().map(|l| l.line_total_millicents()).sum())
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}
