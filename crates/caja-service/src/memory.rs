//! # In-Memory Adapters
//!
//! Reference implementations of the collaborator ports, each carrying the
//! contractual semantics the real adapters must honor: all-or-nothing batch
//! decrement on the ledger, atomic remove-and-return on the suspension
//! backend, recorder-assigned ticket numbers.
//!
//! Used by the test suite and as the behavioral reference for
//! database-backed adapters. Call counters and failure injection exist for
//! tests only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use caja_core::{
    Article, CartLine, CountSnapshotEntry, Money, PromotionApplication, Quantity, SuspendedSale,
};

use crate::error::{ServiceError, ServiceResult};
use crate::ports::{
    CartStore, PromotionEvaluator, PromotionLine, SaleDraft, SaleRecorder, SaleReceipt,
    StockDecrement, StockLedger, SuspensionBackend,
};

// =============================================================================
// Stock Ledger
// =============================================================================

/// Catalog + stock levels in a single map, one lock over both.
pub struct InMemoryStockLedger {
    articles: Mutex<HashMap<String, Article>>,
    decrement_calls: AtomicUsize,
    adjust_calls: AtomicUsize,
}

impl InMemoryStockLedger {
    pub fn new() -> Self {
        Self::with_articles(Vec::new())
    }

    pub fn with_articles(articles: Vec<Article>) -> Self {
        let map = articles.into_iter().map(|a| (a.id.clone(), a)).collect();
        InMemoryStockLedger {
            articles: Mutex::new(map),
            decrement_calls: AtomicUsize::new(0),
            adjust_calls: AtomicUsize::new(0),
        }
    }

    /// Current stock of one article. Test helper.
    pub async fn stock_of(&self, article_id: &str) -> Option<Quantity> {
        let articles = self.articles.lock().await;
        articles.get(article_id).map(|a| a.stock)
    }

    pub fn decrement_calls(&self) -> usize {
        self.decrement_calls.load(Ordering::SeqCst)
    }

    pub fn adjust_calls(&self) -> usize {
        self.adjust_calls.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryStockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    async fn article(&self, article_id: &str) -> ServiceResult<Option<Article>> {
        let articles = self.articles.lock().await;
        Ok(articles.get(article_id).cloned())
    }

    async fn decrement_batch(&self, decrements: &[StockDecrement]) -> ServiceResult<()> {
        self.decrement_calls.fetch_add(1, Ordering::SeqCst);
        let mut articles = self.articles.lock().await;

        // Validate the whole batch under the lock before touching anything
        for decrement in decrements {
            let article =
                articles
                    .get(&decrement.article_id)
                    .ok_or_else(|| ServiceError::ArticleNotFound {
                        id: decrement.article_id.clone(),
                    })?;
            if article.stock < decrement.quantity {
                return Err(ServiceError::StockConflict {
                    article_id: decrement.article_id.clone(),
                });
            }
        }

        for decrement in decrements {
            if let Some(article) = articles.get_mut(&decrement.article_id) {
                article.stock = article.stock - decrement.quantity;
            }
        }
        Ok(())
    }

    async fn adjust(&self, article_id: &str, delta: Quantity) -> ServiceResult<()> {
        self.adjust_calls.fetch_add(1, Ordering::SeqCst);
        let mut articles = self.articles.lock().await;
        let article = articles
            .get_mut(article_id)
            .ok_or_else(|| ServiceError::ArticleNotFound {
                id: article_id.to_string(),
            })?;

        article.stock = article.stock + delta;
        debug!(article_id, %delta, new_stock = %article.stock, "stock adjusted");
        Ok(())
    }

    async fn snapshot_for_count(&self) -> ServiceResult<Vec<CountSnapshotEntry>> {
        let articles = self.articles.lock().await;
        let mut entries: Vec<CountSnapshotEntry> = articles
            .values()
            .filter(|a| a.is_active)
            .map(|a| CountSnapshotEntry {
                article_id: a.id.clone(),
                title: a.title.clone(),
                unit_type: a.unit_type,
                system_quantity: a.stock,
            })
            .collect();
        // Deterministic order for sessions and tests
        entries.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(entries)
    }
}

// =============================================================================
// Promotion Evaluator
// =============================================================================

/// A threshold promotion: a quantity floor on one article (or on the whole
/// cart when `article_id` is `None`) unlocking a fixed discount.
#[derive(Debug, Clone)]
pub struct PromotionRule {
    pub promotion_id: String,
    pub name: String,
    pub article_id: Option<String>,
    pub min_quantity: Quantity,
    pub discount: Money,
}

/// Evaluates a fixed rule set against the cart snapshot.
pub struct RuleBasedPromotionEvaluator {
    rules: Vec<PromotionRule>,
    fail_next: AtomicBool,
}

impl RuleBasedPromotionEvaluator {
    pub fn new(rules: Vec<PromotionRule>) -> Self {
        RuleBasedPromotionEvaluator {
            rules,
            fail_next: AtomicBool::new(false),
        }
    }

    /// Makes the next `evaluate` call fail. Test helper.
    pub fn fail_next_evaluate(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PromotionEvaluator for RuleBasedPromotionEvaluator {
    async fn evaluate(&self, lines: &[PromotionLine]) -> ServiceResult<Vec<PromotionApplication>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ServiceError::CollaboratorUnavailable {
                reason: "promotion evaluator offline".to_string(),
            });
        }

        let applications = self
            .rules
            .iter()
            .filter_map(|rule| match &rule.article_id {
                Some(article_id) => lines
                    .iter()
                    .find(|l| &l.article_id == article_id && l.quantity >= rule.min_quantity)
                    .map(|l| PromotionApplication {
                        promotion_id: rule.promotion_id.clone(),
                        name: rule.name.clone(),
                        estimated_discount: rule.discount,
                        affected_article_ids: vec![l.article_id.clone()],
                    }),
                None => {
                    let total: Quantity = lines.iter().map(|l| l.quantity).sum();
                    (total >= rule.min_quantity).then(|| PromotionApplication {
                        promotion_id: rule.promotion_id.clone(),
                        name: rule.name.clone(),
                        estimated_discount: rule.discount,
                        affected_article_ids: lines.iter().map(|l| l.article_id.clone()).collect(),
                    })
                }
            })
            .collect();

        Ok(applications)
    }
}

// =============================================================================
// Suspension Backend
// =============================================================================

/// Suspended sales keyed by ticket. `pop` is atomic under the map lock.
pub struct InMemorySuspensionBackend {
    suspended: Mutex<HashMap<String, SuspendedSale>>,
}

impl InMemorySuspensionBackend {
    pub fn new() -> Self {
        InMemorySuspensionBackend {
            suspended: Mutex::new(HashMap::new()),
        }
    }

    fn next_ticket() -> String {
        let hex = Uuid::new_v4().simple().to_string().to_uppercase();
        format!("SUSP-{}", &hex[..8])
    }
}

impl Default for InMemorySuspensionBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SuspensionBackend for InMemorySuspensionBackend {
    async fn persist(
        &self,
        lines: Vec<CartLine>,
        note: Option<String>,
    ) -> ServiceResult<SuspendedSale> {
        let record = SuspendedSale {
            ticket: Self::next_ticket(),
            lines,
            note,
            suspended_at: Utc::now(),
        };

        let mut suspended = self.suspended.lock().await;
        suspended.insert(record.ticket.clone(), record.clone());
        Ok(record)
    }

    async fn pop(&self, ticket: &str) -> ServiceResult<Option<SuspendedSale>> {
        let mut suspended = self.suspended.lock().await;
        Ok(suspended.remove(ticket))
    }

    async fn delete(&self, ticket: &str) -> ServiceResult<bool> {
        let mut suspended = self.suspended.lock().await;
        Ok(suspended.remove(ticket).is_some())
    }

    async fn list(&self) -> ServiceResult<Vec<SuspendedSale>> {
        let suspended = self.suspended.lock().await;
        let mut records: Vec<SuspendedSale> = suspended.values().cloned().collect();
        records.sort_by(|a, b| b.suspended_at.cmp(&a.suspended_at));
        Ok(records)
    }
}

// =============================================================================
// Sale Recorder
// =============================================================================

struct RecordedSale {
    sale_id: String,
    draft: SaleDraft,
}

/// Append-only sale log with sequential human-readable tickets.
pub struct InMemorySaleRecorder {
    sales: Mutex<Vec<RecordedSale>>,
    sequence: AtomicU64,
    sale_count: AtomicUsize,
    fail_next: AtomicBool,
}

impl InMemorySaleRecorder {
    pub fn new() -> Self {
        InMemorySaleRecorder {
            sales: Mutex::new(Vec::new()),
            sequence: AtomicU64::new(0),
            sale_count: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn sale_count(&self) -> usize {
        self.sale_count.load(Ordering::SeqCst)
    }

    /// Makes the next `create` call fail. Test helper.
    pub fn fail_next_create(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// The stored note of a sale. Test helper.
    pub async fn note_of(&self, sale_id: &str) -> Option<Option<String>> {
        let sales = self.sales.lock().await;
        sales
            .iter()
            .find(|s| s.sale_id == sale_id)
            .map(|s| s.draft.note.clone())
    }
}

impl Default for InMemorySaleRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SaleRecorder for InMemorySaleRecorder {
    async fn create(&self, draft: SaleDraft) -> ServiceResult<SaleReceipt> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ServiceError::CollaboratorUnavailable {
                reason: "sale recorder offline".to_string(),
            });
        }

        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let hex = Uuid::new_v4().simple().to_string().to_uppercase();
        let receipt = SaleReceipt {
            sale_id: Uuid::new_v4().to_string(),
            ticket_number: format!("T-{}-{}", seq, &hex[..6]),
        };

        let mut sales = self.sales.lock().await;
        sales.push(RecordedSale {
            sale_id: receipt.sale_id.clone(),
            draft,
        });
        self.sale_count.fetch_add(1, Ordering::SeqCst);
        Ok(receipt)
    }

    async fn set_note(&self, sale_id: &str, note: Option<String>) -> ServiceResult<()> {
        let mut sales = self.sales.lock().await;
        let sale = sales
            .iter_mut()
            .find(|s| s.sale_id == sale_id)
            .ok_or_else(|| ServiceError::SaleNotFound {
                id: sale_id.to_string(),
            })?;

        sale.draft.note = note;
        Ok(())
    }
}

// =============================================================================
// Cart Store
// =============================================================================

/// Records every persisted cart snapshot, newest last.
pub struct InMemoryCartStore {
    history: Mutex<Vec<Vec<CartLine>>>,
    persist_count: AtomicUsize,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        InMemoryCartStore {
            history: Mutex::new(Vec::new()),
            persist_count: AtomicUsize::new(0),
        }
    }

    pub fn persist_count(&self) -> usize {
        self.persist_count.load(Ordering::SeqCst)
    }

    /// The most recently persisted snapshot. Test helper.
    pub async fn last(&self) -> Option<Vec<CartLine>> {
        let history = self.history.lock().await;
        history.last().cloned()
    }
}

impl Default for InMemoryCartStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn persist(&self, lines: &[CartLine]) -> ServiceResult<()> {
        let mut history = self.history.lock().await;
        history.push(lines.to_vec());
        self.persist_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caja_core::UnitType;

    fn article(id: &str, stock_units: i64) -> Article {
        Article {
            id: id.to_string(),
            title: format!("Article {}", id),
            barcode: None,
            unit_price: Money::from_cents(1000),
            stock: Quantity::from_units(stock_units),
            unit_type: UnitType::Unit,
            cost_margin: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_decrement_batch_is_all_or_nothing() {
        let ledger = InMemoryStockLedger::with_articles(vec![article("a1", 5), article("a2", 2)]);

        let err = ledger
            .decrement_batch(&[
                StockDecrement {
                    article_id: "a1".to_string(),
                    quantity: Quantity::from_units(3),
                },
                StockDecrement {
                    article_id: "a2".to_string(),
                    quantity: Quantity::from_units(3),
                },
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::StockConflict { ref article_id } if article_id == "a2"));
        assert_eq!(ledger.stock_of("a1").await, Some(Quantity::from_units(5)));
        assert_eq!(ledger.stock_of("a2").await, Some(Quantity::from_units(2)));
    }

    #[tokio::test]
    async fn test_decrement_to_exactly_zero_succeeds() {
        let ledger = InMemoryStockLedger::with_articles(vec![article("a1", 3)]);

        ledger
            .decrement_batch(&[StockDecrement {
                article_id: "a1".to_string(),
                quantity: Quantity::from_units(3),
            }])
            .await
            .unwrap();

        assert_eq!(ledger.stock_of("a1").await, Some(Quantity::zero()));
    }

    #[tokio::test]
    async fn test_adjust_applies_signed_delta() {
        let ledger = InMemoryStockLedger::with_articles(vec![article("a1", 10)]);

        ledger.adjust("a1", Quantity::from_units(-3)).await.unwrap();
        assert_eq!(ledger.stock_of("a1").await, Some(Quantity::from_units(7)));

        ledger.adjust("a1", Quantity::from_units(5)).await.unwrap();
        assert_eq!(ledger.stock_of("a1").await, Some(Quantity::from_units(12)));
    }

    #[tokio::test]
    async fn test_snapshot_excludes_inactive() {
        let mut inactive = article("a2", 4);
        inactive.is_active = false;
        let ledger = InMemoryStockLedger::with_articles(vec![article("a1", 10), inactive]);

        let entries = ledger.snapshot_for_count().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].article_id, "a1");
    }

    #[tokio::test]
    async fn test_cart_level_rule_matches_total_quantity() {
        let evaluator = RuleBasedPromotionEvaluator::new(vec![PromotionRule {
            promotion_id: "bulk".to_string(),
            name: "Compra grande".to_string(),
            article_id: None,
            min_quantity: Quantity::from_units(5),
            discount: Money::from_cents(300),
        }]);

        let lines = vec![
            PromotionLine {
                article_id: "a1".to_string(),
                title: "A1".to_string(),
                unit_price: Money::from_cents(100),
                quantity: Quantity::from_units(3),
            },
            PromotionLine {
                article_id: "a2".to_string(),
                title: "A2".to_string(),
                unit_price: Money::from_cents(100),
                quantity: Quantity::from_units(2),
            },
        ];

        let promos = evaluator.evaluate(&lines).await.unwrap();
        assert_eq!(promos.len(), 1);
        assert_eq!(promos[0].affected_article_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_ticket_formats() {
        let backend = InMemorySuspensionBackend::new();
        let suspended = backend.persist(Vec::new(), None).await.unwrap();
        assert!(suspended.ticket.starts_with("SUSP-"));
        assert_eq!(suspended.ticket.len(), "SUSP-".len() + 8);

        let recorder = InMemorySaleRecorder::new();
        let receipt = recorder
            .create(SaleDraft {
                lines: Vec::new(),
                pricing: caja_core::DiscountState::new().pricing(Money::zero()),
                payment_method: caja_core::PaymentMethod::Cash,
                note: None,
                suspended_sale_id: None,
            })
            .await
            .unwrap();
        assert!(receipt.ticket_number.starts_with("T-1-"));
    }

    #[tokio::test]
    async fn test_set_note_unknown_sale() {
        let recorder = InMemorySaleRecorder::new();
        let err = recorder.set_note("missing", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::SaleNotFound { .. }));
    }
}
