//! # Cart
//!
//! In-memory ordered collection of line items with quantity/stock invariants.
//!
//! ## Invariants
//! - Line identity is by `article_id`: adding the same article again merges
//!   quantities instead of creating a second line
//! - Insertion order is preserved; there is no other ordering guarantee
//! - Every successful mutation leaves `quantity <= stock` as of the catalog
//!   snapshot used for that mutation (stock may still change concurrently;
//!   the finalizer re-checks at decrement time)
//! - A failed mutation leaves the cart exactly as it was
//!
//! Durability is not the cart's concern: the service layer persists the cart
//! through its store port after every successful mutation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::quantity::{Quantity, UnitType};
use crate::types::Article;

/// A line item in the cart.
///
/// `unit_price` and `title` are frozen at the moment the article was added;
/// `stock` is the catalog snapshot used to re-validate quantity edits and is
/// refreshed whenever the same article is added again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub article_id: String,

    /// Title at time of adding (frozen).
    pub title: String,

    /// Price at time of adding (frozen). Catalog price changes do not
    /// reprice lines already in the cart.
    pub unit_price: Money,

    pub unit_type: UnitType,

    /// Quantity in the cart. Positive; integral for unit articles by caller
    /// contract.
    pub quantity: Quantity,

    /// Stock snapshot backing quantity edits on this line.
    pub stock: Quantity,
}

impl CartLine {
    /// Creates a line from a catalog snapshot, freezing price and title.
    pub fn from_article(article: &Article, quantity: Quantity) -> Self {
        CartLine {
            article_id: article.id.clone(),
            title: article.title.clone(),
            unit_price: article.unit_price,
            unit_type: article.unit_type,
            quantity,
            stock: article.stock,
        }
    }

    /// Exact line total in milli-cents (`unit_price x quantity`).
    ///
    /// Kept exact so weight lines do not accumulate per-line rounding error;
    /// conversion to cents happens once per read.
    pub fn line_total_millicents(&self) -> i128 {
        self.unit_price.cents() as i128 * self.quantity.millis() as i128
    }

    /// Line total rounded to cents, for display.
    pub fn line_total(&self) -> Money {
        Money::from_millicents(self.line_total_millicents())
    }
}

/// The cart: an insertion-ordered sequence of lines.
///
/// Created empty at session start or rebuilt 1:1 when a suspended sale is
/// resumed; emptied on sale completion, explicit clear, or suspension.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    /// Rebuilds a cart from a suspended-sale snapshot, verbatim.
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        Cart { lines }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Clones the lines for suspension or finalization snapshots.
    pub fn snapshot(&self) -> Vec<CartLine> {
        self.lines.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of lines (not total quantity).
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total quantity across all lines.
    pub fn total_quantity(&self) -> Quantity {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Adds an article to the cart, merging with an existing line.
    ///
    /// ## Behavior
    /// - `OutOfStock` when the article has no stock at all
    /// - `InvalidQuantity` for a non-positive quantity
    /// - Article already in cart: merged quantity is checked against the
    ///   fresh stock snapshot; on success the line's stock snapshot is
    ///   refreshed while its price stays frozen
    /// - New article: quantity checked against stock, line appended
    ///
    /// On any error the cart is unchanged.
    pub fn add_line(&mut self, article: &Article, quantity: Quantity) -> CoreResult<()> {
        if !article.stock.is_positive() {
            return Err(CoreError::OutOfStock {
                title: article.title.clone(),
            });
        }
        if !quantity.is_positive() {
            return Err(CoreError::InvalidQuantity {
                requested: quantity,
            });
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.article_id == article.id) {
            let merged = line.quantity + quantity;
            if merged > article.stock {
                return Err(CoreError::InsufficientStock {
                    title: article.title.clone(),
                    available: article.stock,
                    requested: merged,
                });
            }
            line.quantity = merged;
            line.stock = article.stock;
            return Ok(());
        }

        if quantity > article.stock {
            return Err(CoreError::InsufficientStock {
                title: article.title.clone(),
                available: article.stock,
                requested: quantity,
            });
        }

        self.lines.push(CartLine::from_article(article, quantity));
        Ok(())
    }

    /// Removes the line at `index`. Out-of-range indices are a no-op.
    pub fn remove_line(&mut self, index: usize) {
        if index < self.lines.len() {
            self.lines.remove(index);
        }
    }

    /// Sets the quantity of the line at `index`.
    ///
    /// ## Behavior
    /// - `new_quantity <= 0` removes the line (same as [`Cart::remove_line`])
    /// - `InsufficientStock` when the new quantity exceeds the line's stock
    ///   snapshot; the line keeps its previous quantity
    /// - `LineNotFound` for an unknown index
    pub fn set_quantity(&mut self, index: usize, new_quantity: Quantity) -> CoreResult<()> {
        if index >= self.lines.len() {
            return Err(CoreError::LineNotFound { index });
        }

        if !new_quantity.is_positive() {
            self.remove_line(index);
            return Ok(());
        }

        let line = &mut self.lines[index];
        if new_quantity > line.stock {
            return Err(CoreError::InsufficientStock {
                title: line.title.clone(),
                available: line.stock,
                requested: new_quantity,
            });
        }

        line.quantity = new_quantity;
        Ok(())
    }

    /// Empties the cart. Always succeeds.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Subtotal before any discount: `sum(unit_price x quantity)`.
    ///
    /// Accumulated exactly in milli-cents across lines and converted to
    /// cents once. Rounding beyond that is a presentation concern.
    pub fn subtotal(&self) -> Money {
        Money::from_millicents(self.lines.iter().map(|l| l.line_total_millicents()).sum())
    }
}
