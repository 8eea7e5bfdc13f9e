//! # Physical Count Session
//!
//! Full-inventory counting pass: per-article expected vs counted quantity,
//! diff computation, and selection of items for stock adjustment.
//!
//! ## Item State Machine
//! ```text
//!            record_count              mark_adjusted
//!  Pending ───────────────► Counted ─────────────────► Adjusted (terminal)
//!                             │  ▲
//!                             └──┘ record_count (re-count, overwrites)
//! ```
//!
//! An item never returns to `Pending`, and `Adjusted` cannot be re-counted.
//! Aggregate stats are derived on read, never stored redundantly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::quantity::{Quantity, UnitType};

// =============================================================================
// Count Item
// =============================================================================

/// Lifecycle state of a single count item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CountStatus {
    /// Not yet counted; `difference` is unknown.
    Pending,
    /// Physically counted; may be re-counted.
    Counted,
    /// Stock correction submitted to the ledger. Terminal.
    Adjusted,
}

/// One article's row in a counting session.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CountItem {
    pub id: String,
    pub article_id: String,
    pub title: String,
    pub unit_type: UnitType,

    /// Stock according to the system, captured at session start and frozen.
    pub system_quantity: Quantity,

    /// Physically counted stock; `None` until counted.
    pub physical_quantity: Option<Quantity>,

    /// `physical_quantity - system_quantity`; `None` while uncounted.
    pub difference: Option<Quantity>,

    pub status: CountStatus,

    #[ts(as = "Option<String>")]
    pub counted_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub adjusted_at: Option<DateTime<Utc>>,

    /// Observations recorded while counting.
    pub notes: Option<String>,
}

impl CountItem {
    /// True when counted and the physical quantity deviates from the system.
    pub fn has_difference(&self) -> bool {
        self.difference.is_some_and(|d| !d.is_zero())
    }
}

// =============================================================================
// Count Session
// =============================================================================

/// One article's system stock at the instant the session started.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CountSnapshotEntry {
    pub article_id: String,
    pub title: String,
    pub unit_type: UnitType,
    pub system_quantity: Quantity,
}

/// Which count items to adjust.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "ids")]
pub enum AdjustSelection {
    /// Every counted item with a non-zero difference. Items with zero
    /// difference are excluded silently, not an error.
    All,
    /// Specific count item ids (still filtered to counted-with-difference).
    Items(Vec<String>),
}

impl AdjustSelection {
    fn includes(&self, item: &CountItem) -> bool {
        match self {
            AdjustSelection::All => true,
            AdjustSelection::Items(ids) => ids.iter().any(|id| id == &item.id),
        }
    }
}

/// Derived aggregate stats for a session. Computed on read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CountStats {
    pub total: usize,
    pub counted: usize,
    pub pending: usize,
    pub adjusted: usize,
    pub with_difference: usize,
    /// `counted / total` (adjusted items count as counted); 0 for an empty
    /// session.
    pub progress: f64,
}

/// A full-inventory counting pass.
///
/// Terminal when every differing item has been adjusted or the session is
/// abandoned; partial completion is an accepted state and never blocks.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CountSession {
    pub id: String,
    #[ts(as = "String")]
    pub started_at: DateTime<Utc>,
    items: Vec<CountItem>,
}

impl CountSession {
    /// Starts a session from a snapshot of all active articles' stock.
    /// Every item begins `Pending` with an unknown difference.
    pub fn start(entries: Vec<CountSnapshotEntry>) -> Self {
        let items = entries
            .into_iter()
            .map(|e| CountItem {
                id: Uuid::new_v4().to_string(),
                article_id: e.article_id,
                title: e.title,
                unit_type: e.unit_type,
                system_quantity: e.system_quantity,
                physical_quantity: None,
                difference: None,
                status: CountStatus::Pending,
                counted_at: None,
                adjusted_at: None,
                notes: None,
            })
            .collect();

        CountSession {
            id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            items,
        }
    }

    pub fn items(&self) -> &[CountItem] {
        &self.items
    }

    pub fn item(&self, item_id: &str) -> Option<&CountItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// Records a physical count for an item.
    ///
    /// ## Behavior
    /// - `InvalidQuantity` for a negative physical quantity
    /// - `ItemNotFound` for an unknown id
    /// - `ItemAlreadyAdjusted` when the item is terminal
    /// - Re-counting a `Counted` item overwrites the previous value
    pub fn record_count(
        &mut self,
        item_id: &str,
        physical_quantity: Quantity,
        notes: Option<String>,
    ) -> CoreResult<&CountItem> {
        if physical_quantity.is_negative() {
            return Err(CoreError::InvalidQuantity {
                requested: physical_quantity,
            });
        }

        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| CoreError::ItemNotFound {
                id: item_id.to_string(),
            })?;

        if item.status == CountStatus::Adjusted {
            return Err(CoreError::ItemAlreadyAdjusted {
                id: item_id.to_string(),
            });
        }

        item.physical_quantity = Some(physical_quantity);
        item.difference = Some(physical_quantity - item.system_quantity);
        item.status = CountStatus::Counted;
        item.counted_at = Some(Utc::now());
        if notes.is_some() {
            item.notes = notes;
        }

        Ok(&*item)
    }

    /// Ids of the items eligible for adjustment under the selection:
    /// status `Counted` with a non-zero difference.
    pub fn eligible_for_adjustment(&self, selection: &AdjustSelection) -> Vec<&CountItem> {
        self.items
            .iter()
            .filter(|i| i.status == CountStatus::Counted && i.has_difference())
            .filter(|i| selection.includes(i))
            .collect()
    }

    /// Transitions an item to `Adjusted` after its stock correction was
    /// accepted by the ledger.
    pub fn mark_adjusted(&mut self, item_id: &str) -> CoreResult<&CountItem> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| CoreError::ItemNotFound {
                id: item_id.to_string(),
            })?;

        item.status = CountStatus::Adjusted;
        item.adjusted_at = Some(Utc::now());
        Ok(&*item)
    }

    /// Derives the aggregate stats.
    pub fn stats(&self) -> CountStats {
        let total = self.items.len();
        let pending = self
            .items
            .iter()
            .filter(|i| i.status == CountStatus::Pending)
            .count();
        let adjusted = self
            .items
            .iter()
            .filter(|i| i.status == CountStatus::Adjusted)
            .count();
        let counted = total - pending;
        let with_difference = self.items.iter().filter(|i| i.has_difference()).count();

        CountStats {
            total,
            counted,
            pending,
            adjusted,
            with_difference,
            progress: if total == 0 {
                0.0
            } else {
                counted as f64 / total as f64
            },
        }
    }
}
