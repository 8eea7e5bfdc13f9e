//! # Physical Count Workflow
//!
//! Orchestrates [`CountSession`]s over the stock ledger: snapshot at start,
//! count recording, and the adjustment pass that submits each non-zero
//! difference as a signed stock correction.
//!
//! Adjustment is applied item by item. A ledger failure mid-pass stops the
//! pass and surfaces the error; items adjusted before the failure stay
//! `Adjusted` (partial completion is an accepted session state, never rolled
//! back).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use caja_core::{AdjustSelection, CoreError, CountItem, CountSession, CountStats, Quantity};

use crate::error::{ServiceError, ServiceResult};
use crate::ports::StockLedger;

/// Outcome of an adjustment pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentOutcome {
    /// Count item ids whose corrections were accepted by the ledger.
    pub adjusted_item_ids: Vec<String>,
}

/// Counting sessions keyed by id, adjusted against a [`StockLedger`].
pub struct CountService {
    ledger: Arc<dyn StockLedger>,
    sessions: Mutex<HashMap<String, CountSession>>,
}

impl CountService {
    pub fn new(ledger: Arc<dyn StockLedger>) -> Self {
        CountService {
            ledger,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a session from a fresh snapshot of every active article.
    pub async fn start(&self) -> ServiceResult<CountSession> {
        let entries = self.ledger.snapshot_for_count().await?;
        let session = CountSession::start(entries);
        info!(session_id = %session.id, items = session.items().len(), "count session started");

        let mut sessions = self.sessions.lock().await;
        sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    /// Current state of a session.
    pub async fn session(&self, session_id: &str) -> ServiceResult<CountSession> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| ServiceError::SessionNotFound {
                id: session_id.to_string(),
            })
    }

    /// Derived aggregate stats for a session.
    pub async fn stats(&self, session_id: &str) -> ServiceResult<CountStats> {
        Ok(self.session(session_id).await?.stats())
    }

    /// Records a physical count for one item.
    pub async fn record_count(
        &self,
        session_id: &str,
        item_id: &str,
        physical_quantity: Quantity,
        notes: Option<String>,
    ) -> ServiceResult<CountItem> {
        let mut sessions = self.sessions.lock().await;
        let session =
            sessions
                .get_mut(session_id)
                .ok_or_else(|| ServiceError::SessionNotFound {
                    id: session_id.to_string(),
                })?;

        let item = session.record_count(item_id, physical_quantity, notes)?;
        debug!(
            session_id,
            item_id,
            %physical_quantity,
            difference = %item.difference.unwrap_or_else(Quantity::zero),
            "count recorded"
        );
        Ok(item.clone())
    }

    /// Submits stock corrections for the selected items.
    ///
    /// Eligibility is `Counted` with a non-zero difference; selecting items
    /// without a difference is silently a no-op for those items. An empty
    /// eligible set fails with `NothingToAdjust` before touching the ledger.
    pub async fn adjust(
        &self,
        session_id: &str,
        selection: AdjustSelection,
    ) -> ServiceResult<AdjustmentOutcome> {
        let mut sessions = self.sessions.lock().await;
        let session =
            sessions
                .get_mut(session_id)
                .ok_or_else(|| ServiceError::SessionNotFound {
                    id: session_id.to_string(),
                })?;

        let corrections: Vec<(String, String, Quantity)> = session
            .eligible_for_adjustment(&selection)
            .into_iter()
            .filter_map(|item| {
                item.difference
                    .map(|d| (item.id.clone(), item.article_id.clone(), d))
            })
            .collect();

        if corrections.is_empty() {
            return Err(ServiceError::Core(CoreError::NothingToAdjust));
        }

        let mut adjusted_item_ids = Vec::with_capacity(corrections.len());
        for (item_id, article_id, delta) in corrections {
            if let Err(e) = self.ledger.adjust(&article_id, delta).await {
                warn!(
                    session_id,
                    article_id = %article_id,
                    error = %e,
                    "adjustment pass stopped; earlier corrections stand"
                );
                return Err(e);
            }
            session.mark_adjusted(&item_id)?;
            adjusted_item_ids.push(item_id);
        }

        info!(
            session_id,
            adjusted = adjusted_item_ids.len(),
            "stock adjustments applied"
        );
        Ok(AdjustmentOutcome { adjusted_item_ids })
    }
}
