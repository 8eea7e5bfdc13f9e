//! End-to-end register flows over the in-memory adapters: sell, suspend and
//! resume, finalize with discounts, lose a stock race, count and adjust.

use std::sync::Arc;

use caja_core::{
    AdjustSelection, Article, CoreError, DiscountValue, Money, PaymentMethod, Quantity, UnitType,
};
use caja_service::memory::{
    InMemoryCartStore, InMemorySaleRecorder, InMemoryStockLedger, InMemorySuspensionBackend,
    PromotionRule, RuleBasedPromotionEvaluator,
};
use caja_service::{
    CountService, RegisterSession, SaleFinalizer, ServiceError, StockDecrement, StockLedger,
    SuspensionService,
};

struct Fixture {
    session: RegisterSession,
    suspensions: SuspensionService,
    finalizer: SaleFinalizer,
    counting: CountService,
    ledger: Arc<InMemoryStockLedger>,
    evaluator: Arc<RuleBasedPromotionEvaluator>,
    recorder: Arc<InMemorySaleRecorder>,
    cart_store: Arc<InMemoryCartStore>,
}

fn article(id: &str, title: &str, price_cents: i64, stock_millis: i64, unit_type: UnitType) -> Article {
    Article {
        id: id.to_string(),
        title: title.to_string(),
        barcode: None,
        unit_price: Money::from_cents(price_cents),
        stock: Quantity::from_millis(stock_millis),
        unit_type,
        cost_margin: None,
        is_active: true,
    }
}

fn fixture(articles: Vec<Article>, rules: Vec<PromotionRule>) -> Fixture {
    let ledger = Arc::new(InMemoryStockLedger::with_articles(articles));
    let evaluator = Arc::new(RuleBasedPromotionEvaluator::new(rules));
    let cart_store = Arc::new(InMemoryCartStore::new());
    let backend = Arc::new(InMemorySuspensionBackend::new());
    let recorder = Arc::new(InMemorySaleRecorder::new());

    Fixture {
        session: RegisterSession::new(ledger.clone(), evaluator.clone(), cart_store.clone()),
        suspensions: SuspensionService::new(backend.clone()),
        finalizer: SaleFinalizer::new(ledger.clone(), recorder.clone(), backend),
        counting: CountService::new(ledger.clone()),
        ledger,
        evaluator,
        recorder,
        cart_store,
    }
}

#[tokio::test]
async fn sell_with_discount_and_promotion() {
    let fx = fixture(
        vec![
            article("leche", "Leche 1L", 1500, 10_000, UnitType::Unit),
            article("queso", "Queso", 1299, 5_000, UnitType::Weight),
        ],
        vec![PromotionRule {
            promotion_id: "leche-2x".to_string(),
            name: "Leche x2".to_string(),
            article_id: Some("leche".to_string()),
            min_quantity: Quantity::from_units(2),
            discount: Money::from_cents(500),
        }],
    );

    fx.session.add_line("leche", Quantity::from_units(2)).await.unwrap();
    // 1.5 kg at $12.99/kg: exact accumulation, rounded once
    let view = fx
        .session
        .add_line("queso", Quantity::from_millis(1_500))
        .await
        .unwrap();

    assert_eq!(view.pricing.subtotal.cents(), 3000 + 1949);
    assert_eq!(view.promotions.len(), 1);

    let view = fx
        .session
        .apply_manual_discount(DiscountValue::FixedAmount(Money::from_cents(449)), "redondeo")
        .await
        .unwrap();
    assert_eq!(view.pricing.discount_total.cents(), 500 + 449);
    assert_eq!(view.pricing.total.cents(), 4000);

    let sale = fx
        .session
        .checkout(&fx.finalizer, PaymentMethod::Cash, None)
        .await
        .unwrap();

    assert_eq!(sale.total.cents(), 4000);
    assert_eq!(sale.lines.len(), 2);
    assert!(sale.ticket_number.starts_with("T-1-"));
    assert_eq!(fx.recorder.sale_count(), 1);

    // Stock moved exactly once, by the sold quantities
    assert_eq!(fx.ledger.stock_of("leche").await, Some(Quantity::from_units(8)));
    assert_eq!(fx.ledger.stock_of("queso").await, Some(Quantity::from_millis(3_500)));

    // Register is clean for the next customer
    let view = fx.session.view().await;
    assert!(view.lines.is_empty());
    assert!(view.manual_discount.is_none());
    assert!(view.promotions.is_empty());
}

#[tokio::test]
async fn suspend_resume_and_finalize_consumes_ticket() {
    let fx = fixture(
        vec![article("pan", "Pan", 350, 20_000, UnitType::Unit)],
        Vec::new(),
    );

    fx.session.add_line("pan", Quantity::from_units(3)).await.unwrap();
    let suspended = fx
        .session
        .suspend(&fx.suspensions, Some("cliente fue por efectivo".to_string()))
        .await
        .unwrap();

    // The register is free; suspension did not move stock
    assert!(fx.session.view().await.lines.is_empty());
    assert_eq!(fx.ledger.stock_of("pan").await, Some(Quantity::from_units(20)));
    assert_eq!(fx.suspensions.list().await.unwrap().len(), 1);

    // Claim it back: prices and quantities come back 1:1
    let claimed = fx.suspensions.resume(&suspended.ticket).await.unwrap();
    let view = fx.session.restore(claimed).await.unwrap();
    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.pricing.subtotal.cents(), 1050);
    assert_eq!(view.resumed_from.as_deref(), Some(suspended.ticket.as_str()));

    let sale = fx
        .session
        .checkout(&fx.finalizer, PaymentMethod::Card, None)
        .await
        .unwrap();
    assert_eq!(sale.suspended_sale_id.as_deref(), Some(suspended.ticket.as_str()));

    // The ticket is consumed: it cannot be resumed again
    assert!(fx.suspensions.list().await.unwrap().is_empty());
    let err = fx.suspensions.resume(&suspended.ticket).await.unwrap_err();
    assert!(matches!(err, ServiceError::TicketNotFound { .. }));
}

#[tokio::test]
async fn losing_stock_race_keeps_cart_intact() {
    let fx = fixture(
        vec![article("vino", "Vino", 8900, 2_000, UnitType::Unit)],
        Vec::new(),
    );

    fx.session.add_line("vino", Quantity::from_units(2)).await.unwrap();

    // Another register sells one bottle first
    fx.ledger
        .decrement_batch(&[StockDecrement {
            article_id: "vino".to_string(),
            quantity: Quantity::one(),
        }])
        .await
        .unwrap();

    let err = fx
        .session
        .checkout(&fx.finalizer, PaymentMethod::Cash, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::StockConflict { .. }));

    // Nothing was recorded, nothing further decremented, cart still editable
    assert_eq!(fx.recorder.sale_count(), 0);
    assert_eq!(fx.ledger.stock_of("vino").await, Some(Quantity::one()));
    let view = fx.session.set_quantity(0, Quantity::one()).await.unwrap();
    assert_eq!(view.pricing.total.cents(), 8900);

    fx.session
        .checkout(&fx.finalizer, PaymentMethod::Cash, None)
        .await
        .unwrap();
    assert_eq!(fx.ledger.stock_of("vino").await, Some(Quantity::zero()));
}

#[tokio::test]
async fn evaluator_outage_keeps_previous_promotions() {
    let fx = fixture(
        vec![article("cafe", "Café", 2000, 10_000, UnitType::Unit)],
        vec![PromotionRule {
            promotion_id: "cafe-promo".to_string(),
            name: "Café promo".to_string(),
            article_id: Some("cafe".to_string()),
            min_quantity: Quantity::one(),
            discount: Money::from_cents(200),
        }],
    );

    let view = fx.session.add_line("cafe", Quantity::one()).await.unwrap();
    assert_eq!(view.promotions.len(), 1);

    // The next speculative evaluation fails: the mutation still succeeds and
    // the previous promotion set stands
    fx.evaluator.fail_next_evaluate();
    let view = fx.session.add_line("cafe", Quantity::one()).await.unwrap();
    assert_eq!(view.lines[0].quantity, Quantity::from_units(2));
    assert_eq!(view.promotions.len(), 1);
    assert_eq!(fx.cart_store.persist_count(), 2);
}

#[tokio::test]
async fn count_session_reconciles_after_sales() {
    let fx = fixture(
        vec![
            article("leche", "Leche 1L", 1500, 10_000, UnitType::Unit),
            article("pan", "Pan", 350, 8_000, UnitType::Unit),
        ],
        Vec::new(),
    );

    fx.session.add_line("leche", Quantity::from_units(4)).await.unwrap();
    fx.session
        .checkout(&fx.finalizer, PaymentMethod::Cash, None)
        .await
        .unwrap();

    let session = fx.counting.start().await.unwrap();
    let leche = session
        .items()
        .iter()
        .find(|i| i.article_id == "leche")
        .unwrap()
        .id
        .clone();
    let pan = session
        .items()
        .iter()
        .find(|i| i.article_id == "pan")
        .unwrap()
        .id
        .clone();

    // Shelf shows one extra leche and exactly the expected pan
    let item = fx
        .counting
        .record_count(&session.id, &leche, Quantity::from_units(7), None)
        .await
        .unwrap();
    assert_eq!(item.difference, Some(Quantity::from_units(1)));
    fx.counting
        .record_count(&session.id, &pan, Quantity::from_units(8), None)
        .await
        .unwrap();

    let outcome = fx
        .counting
        .adjust(&session.id, AdjustSelection::All)
        .await
        .unwrap();
    assert_eq!(outcome.adjusted_item_ids, vec![leche]);

    // System stock now matches the shelf
    assert_eq!(fx.ledger.stock_of("leche").await, Some(Quantity::from_units(7)));
    assert_eq!(fx.ledger.stock_of("pan").await, Some(Quantity::from_units(8)));
}

#[tokio::test]
async fn cart_view_serializes_camel_case() {
    let fx = fixture(
        vec![article("pan", "Pan", 350, 20_000, UnitType::Unit)],
        Vec::new(),
    );

    let view = fx.session.add_line("pan", Quantity::from_units(2)).await.unwrap();
    let json = serde_json::to_value(&view).unwrap();

    assert_eq!(json["lines"][0]["articleId"], "pan");
    assert_eq!(json["lines"][0]["unitType"], "unit");
    assert!(json["pricing"]["discountTotal"].is_number());
    assert!(json["manualDiscount"].is_null());
    assert!(json["resumedFrom"].is_null());
}

#[tokio::test]
async fn empty_cart_cannot_suspend_or_checkout() {
    let fx = fixture(Vec::new(), Vec::new());

    let err = fx.session.suspend(&fx.suspensions, None).await.unwrap_err();
    assert!(matches!(err, ServiceError::Core(CoreError::EmptyCart)));

    let err = fx
        .session
        .checkout(&fx.finalizer, PaymentMethod::Cash, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Core(CoreError::EmptyCart)));
}
