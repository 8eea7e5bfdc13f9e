//! # caja-core: Pure Business Logic for Caja POS
//!
//! The transaction core of a retail point of sale, as pure functions and
//! types with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Register client (web UI)                            │
//! └─────────────────────────────┬───────────────────────────────────────────┘
//! ┌─────────────────────────────▼───────────────────────────────────────────┐
//! │          caja-service: orchestration over collaborator ports            │
//! │   (stock ledger, promotion evaluator, suspension store, recorder)       │
//! └─────────────────────────────┬───────────────────────────────────────────┘
//! ┌─────────────────────────────▼───────────────────────────────────────────┐
//! │                   ★ caja-core (THIS CRATE) ★                            │
//! │                                                                         │
//! │   ┌────────┐ ┌──────────┐ ┌───────┐ ┌──────────┐ ┌───────┐             │
//! │   │ money  │ │ quantity │ │ cart  │ │ discount │ │ count │             │
//! │   └────────┘ └──────────┘ └───────┘ └──────────┘ └───────┘             │
//! │                                                                         │
//! │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Integer-cent money with exact milli-cent accumulation
//! - [`quantity`] - Fixed-point quantities (0.001 granularity) and unit types
//! - [`types`] - Domain types (Article, Sale, SuspendedSale, ...)
//! - [`cart`] - Cart composition under stock constraints
//! - [`discount`] - Manual discount + promotion set with clamped totals
//! - [`count`] - Physical-count session state machine
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: same input, same output
//! 2. **No I/O**: collaborators live behind the service layer's ports
//! 3. **Integer money and fixed-point quantities**: no floats in invariants
//! 4. **Explicit errors**: typed variants, never strings or panics; failed
//!    operations leave state unchanged

pub mod cart;
pub mod count;
pub mod discount;
pub mod error;
pub mod money;
pub mod quantity;
pub mod types;

pub use cart::{Cart, CartLine};
pub use count::{
    AdjustSelection, CountItem, CountSession, CountSnapshotEntry, CountStats, CountStatus,
};
pub use discount::{CartPricing, DiscountState, DiscountValue, ManualDiscount, PromotionApplication};
pub use error::{CoreError, CoreResult};
pub use money::Money;
pub use quantity::{Quantity, UnitType};
pub use types::{Article, PaymentMethod, Sale, SaleLine, SuspendedSale};
