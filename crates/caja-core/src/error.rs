//! # Error Types
//!
//! Domain errors for the transaction core.
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (article title, index, item id)
//! 3. Errors are enum variants, never String
//! 4. Every variant is recoverable by the caller: the operation that failed
//!    leaves local state unchanged

use thiserror::Error;

use crate::quantity::Quantity;

/// Business rule violations in the transaction core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Article has no stock at all; it cannot enter the cart.
    #[error("{title} is out of stock")]
    OutOfStock { title: String },

    /// Requested quantity exceeds the available stock.
    ///
    /// Raised both when adding (merged quantity checked against the catalog
    /// snapshot) and when editing a line's quantity. The cart is left
    /// unchanged in either case.
    #[error("insufficient stock for {title}: available {available}, requested {requested}")]
    InsufficientStock {
        title: String,
        available: Quantity,
        requested: Quantity,
    },

    /// Operation requires a non-empty cart (suspend, finalize).
    #[error("cart is empty")]
    EmptyCart,

    /// At most one manual discount per cart; remove the current one first.
    #[error("a manual discount is already applied")]
    DiscountAlreadyApplied,

    /// Manual discount value outside its valid range.
    #[error("invalid discount value: {reason}")]
    InvalidDiscountValue { reason: String },

    /// Quantity is not usable for the operation (non-positive add, negative
    /// physical count).
    #[error("invalid quantity: {requested}")]
    InvalidQuantity { requested: Quantity },

    /// Cart line index does not exist.
    #[error("no cart line at index {index}")]
    LineNotFound { index: usize },

    /// Count item id does not exist in the session.
    #[error("count item not found: {id}")]
    ItemNotFound { id: String },

    /// Adjusted is terminal; the item cannot be re-counted.
    #[error("count item {id} is already adjusted")]
    ItemAlreadyAdjusted { id: String },

    /// Adjustment selection yielded zero eligible items.
    #[error("no counted items with differences to adjust")]
    NothingToAdjust,
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            title: "Coca-Cola 330ml".to_string(),
            available: Quantity::from_units(3),
            requested: Quantity::from_units(5),
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for Coca-Cola 330ml: available 3, requested 5"
        );

        let err = CoreError::LineNotFound { index: 4 };
        assert_eq!(err.to_string(), "no cart line at index 4");
    }
}
