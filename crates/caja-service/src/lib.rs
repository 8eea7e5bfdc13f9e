//! # caja-service: Transaction Orchestration for Caja POS
//!
//! Drives the pure transaction core (caja-core) over async collaborator
//! ports: the register session, sale suspension, finalization with
//! all-or-nothing stock decrement, and the physical-count workflow.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Register client (web UI)                            │
//! └─────────────────────────────┬───────────────────────────────────────────┘
//! ┌─────────────────────────────▼───────────────────────────────────────────┐
//! │                   ★ caja-service (THIS CRATE) ★                         │
//! │                                                                         │
//! │   ┌──────────┐ ┌────────────┐ ┌──────────┐ ┌──────────┐                │
//! │   │ register │ │ suspension │ │ checkout │ │ counting │                │
//! │   └────┬─────┘ └─────┬──────┘ └────┬─────┘ └────┬─────┘                │
//! │        │             │             │            │                      │
//! │   ┌────▼─────────────▼─────────────▼────────────▼─────┐                │
//! │   │  ports: StockLedger · PromotionEvaluator ·        │                │
//! │   │  SuspensionBackend · SaleRecorder · CartStore     │                │
//! │   └───────────────────────────────────────────────────┘                │
//! └─────────────────────────────┬───────────────────────────────────────────┘
//! ┌─────────────────────────────▼───────────────────────────────────────────┐
//! │               caja-core: pure business logic, no I/O                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`ports`] - Collaborator boundary traits and their DTOs
//! - [`register`] - The cashier session: cart, discounts, durability,
//!   speculative promotion re-evaluation
//! - [`suspension`] - Park / claim / discard suspended sales
//! - [`checkout`] - Finalization ordering and stock-decrement compensation
//! - [`counting`] - Physical-count sessions and stock adjustment
//! - [`memory`] - In-memory reference adapters for the ports
//! - [`error`] - Service error type

pub mod checkout;
pub mod counting;
pub mod error;
pub mod memory;
pub mod ports;
pub mod register;
pub mod suspension;

pub use checkout::SaleFinalizer;
pub use counting::{AdjustmentOutcome, CountService};
pub use error::{ServiceError, ServiceResult};
pub use ports::{
    CartStore, PromotionEvaluator, PromotionLine, SaleDraft, SaleReceipt, SaleRecorder,
    StockDecrement, StockLedger, SuspensionBackend,
};
pub use register::{CartView, RegisterSession};
pub use suspension::SuspensionService;
