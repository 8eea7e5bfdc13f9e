//! # Sale Suspension
//!
//! Parks an in-progress cart under a short ticket so the register can serve
//! the next customer, and hands it back 1:1 on resume.
//!
//! Resume is the only racy operation: two registers asking for the same
//! ticket must not both get the cart. The backend's `pop` is an atomic
//! remove-and-return, so the loser simply sees `TicketNotFound`.

use std::sync::Arc;

use tracing::{debug, info};

use caja_core::{CartLine, CoreError, SuspendedSale};

use crate::error::{ServiceError, ServiceResult};
use crate::ports::SuspensionBackend;

/// Suspend / resume / browse operations over a [`SuspensionBackend`].
pub struct SuspensionService {
    backend: Arc<dyn SuspensionBackend>,
}

impl SuspensionService {
    pub fn new(backend: Arc<dyn SuspensionBackend>) -> Self {
        SuspensionService { backend }
    }

    /// Persists a cart snapshot as a suspended sale.
    ///
    /// Empty carts cannot be suspended; the guard runs before any backend
    /// call. Line prices are frozen as captured.
    pub async fn suspend(
        &self,
        lines: Vec<CartLine>,
        note: Option<String>,
    ) -> ServiceResult<SuspendedSale> {
        if lines.is_empty() {
            return Err(ServiceError::Core(CoreError::EmptyCart));
        }

        let suspended = self.backend.persist(lines, note).await?;
        info!(ticket = %suspended.ticket, lines = suspended.line_count(), "cart suspended");
        Ok(suspended)
    }

    /// Claims a suspended sale by ticket, removing it from the pending set.
    ///
    /// Exactly one caller can win a given ticket; everyone else gets
    /// `TicketNotFound`.
    pub async fn resume(&self, ticket: &str) -> ServiceResult<SuspendedSale> {
        let suspended =
            self.backend
                .pop(ticket)
                .await?
                .ok_or_else(|| ServiceError::TicketNotFound {
                    ticket: ticket.to_string(),
                })?;

        info!(ticket = %suspended.ticket, "suspended sale claimed");
        Ok(suspended)
    }

    /// Discards a suspended sale without resuming it.
    pub async fn delete(&self, ticket: &str) -> ServiceResult<()> {
        let existed = self.backend.delete(ticket).await?;
        if !existed {
            return Err(ServiceError::TicketNotFound {
                ticket: ticket.to_string(),
            });
        }
        debug!(ticket, "suspended sale deleted");
        Ok(())
    }

    /// Pending suspensions, most recent first.
    pub async fn list(&self) -> ServiceResult<Vec<SuspendedSale>> {
        self.backend.list().await
    }
}
