//! # ndayane-core: Pure Business Logic for Ndayane POS
//!
//! The rules of the shop, as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Ndayane POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            HTTP layer / dashboard (not in this workspace)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ndayane-services (transactions)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ ndayane-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  pricing  │  │  ledger   │  │ numbering │  │   │
//! │  │   │  Sale     │  │ cart →    │  │ status,   │  │ VT202610  │  │   │
//! │  │   │  Payment  │  │ totals    │  │ credit    │  │ 0001      │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  ndayane-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, Payment, Client, ...)
//! - [`money`] - Money type with integer arithmetic (francs CFA)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//! - [`pricing`] - Cart lines to sale totals
//! - [`ledger`] - Sale status from payments, client credit, balance effects
//! - [`numbering`] - Human-readable document numbers
//!
//! ## Example Usage
//!
//! ```rust
//! use ndayane_core::money::Money;
//! use ndayane_core::ledger::available_credit;
//!
//! // A negative balance is credit held by the client
//! let credit = available_credit(Money::new(-2000));
//! assert_eq!(credit, Money::new(2000));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod numbering;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed on a single sale.
pub const MAX_SALE_LINES: usize = 200;

/// Maximum quantity of a single product on one line.
///
/// ## Business Reason
/// Hardware sells by the unit, the bag and the metre; 10 000 is far above any
/// counter sale and catches typing mistakes (an extra zero on cement bags).
pub const MAX_LINE_QUANTITY: i64 = 10_000;

/// Maximum unit price, in FCFA.
///
/// Together with [`MAX_LINE_QUANTITY`] and [`MAX_SALE_LINES`] it keeps every
/// sale total far inside `i64`.
pub const MAX_UNIT_PRICE: i64 = 100_000_000;

/// Maximum single amount (discount, payment, deposit), in FCFA.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;
