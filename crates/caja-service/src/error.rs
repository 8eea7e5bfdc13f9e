//! # Service Error Type
//!
//! Unified error type for the orchestration layer.
//!
//! ## Error Handling Strategy
//! Domain rule violations bubble up from caja-core unchanged via `#[from]`.
//! Everything the collaborators can do wrong gets its own variant here:
//! lookups that miss, stock races at decrement time, and plain collaborator
//! outages. Every variant is recoverable by the caller; the operation that
//! failed left local state untouched, and the core never retries on its own.

use thiserror::Error;

use caja_core::CoreError;

/// Errors surfaced by the service layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Business rule violation from the transaction core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Article id unknown to the stock ledger.
    #[error("article not found: {id}")]
    ArticleNotFound { id: String },

    /// Suspended-sale ticket does not exist (already resumed, deleted, or
    /// invalid).
    #[error("suspended sale not found: {ticket}")]
    TicketNotFound { ticket: String },

    /// Count session id unknown.
    #[error("count session not found: {id}")]
    SessionNotFound { id: String },

    /// Sale id unknown to the recorder.
    #[error("sale not found: {id}")]
    SaleNotFound { id: String },

    /// A stock decrement lost the race: the ledger refused to go negative.
    ///
    /// Raised from the all-or-nothing batch decrement at finalize time; no
    /// partial decrements were committed. The caller decides whether to
    /// refresh the cart and retry.
    #[error("stock conflict on article {article_id}")]
    StockConflict { article_id: String },

    /// A collaborator call failed outright (network, ledger unavailable).
    /// Never swallowed; retry policy belongs to the caller.
    #[error("collaborator unavailable: {reason}")]
    CollaboratorUnavailable { reason: String },
}

/// Convenience type alias for Results with ServiceError.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use caja_core::Quantity;

    #[test]
    fn test_core_errors_pass_through() {
        let err: ServiceError = CoreError::EmptyCart.into();
        assert_eq!(err.to_string(), "cart is empty");

        let err: ServiceError = CoreError::InvalidQuantity {
            requested: Quantity::from_units(-1),
        }
        .into();
        assert!(matches!(err, ServiceError::Core(_)));
    }

    #[test]
    fn test_service_error_messages() {
        let err = ServiceError::TicketNotFound {
            ticket: "SUSP-DEADBEEF".to_string(),
        };
        assert_eq!(err.to_string(), "suspended sale not found: SUSP-DEADBEEF");

        let err = ServiceError::StockConflict {
            article_id: "a1".to_string(),
        };
        assert_eq!(err.to_string(), "stock conflict on article a1");
    }
}
