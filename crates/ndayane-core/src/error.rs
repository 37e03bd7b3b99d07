//! # Error Types
//!
//! Domain-specific error types for ndayane-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  ndayane-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  ndayane-db errors                                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  ndayane-services errors                                               │
//! │  └── ServiceError     - What the caller sees (code + message)          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError ← DbError            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
///
/// Every variant is a "bad request" from the caller's point of view: the
/// request was understood but the shop's rules refuse it.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A sale needs at least one line.
    #[error("A sale must contain at least one line")]
    EmptySale,

    /// A purchase order needs at least one line.
    #[error("A purchase order must contain at least one line")]
    EmptyOrder,

    /// Too many lines on one document.
    #[error("A sale cannot have more than {max} lines")]
    TooManyLines { max: usize },

    /// The overall discount would make the sale total negative.
    #[error("Discount {discount} exceeds subtotal {subtotal}")]
    DiscountExceedsSubtotal { discount: Money, subtotal: Money },

    /// A line discount exceeds the gross amount of the line.
    #[error("Line discount {discount} exceeds line amount {gross} for product {product_id}")]
    LineDiscountExceedsAmount {
        product_id: String,
        discount: Money,
        gross: Money,
    },

    /// A product needed for pricing is missing from the catalog lookup.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Deactivated products cannot be sold or ordered.
    #[error("Product {0} is deactivated")]
    ProductInactive(String),

    /// Sale is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Validating a sale that is not `EN_ATTENTE`
    #[error("Sale {number} is {current}, it cannot be {operation}")]
    InvalidSaleStatus {
        number: String,
        current: String,
        operation: String,
    },

    /// Purchase order is not in a state that allows the requested operation.
    #[error("Purchase order {number} is {current}, it cannot be {operation}")]
    InvalidOrderStatus {
        number: String,
        current: String,
        operation: String,
    },

    /// Deposits are always tied to a client account.
    #[error("A client is required to record a deposit")]
    ClientRequired,

    /// Client asked to spend more credit than is held on account.
    #[error("Insufficient credit: available {available}, requested {requested}")]
    InsufficientCredit { available: Money, requested: Money },

    /// Not enough stock to move out of a warehouse (transfers only).
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Orders cannot be placed with a deactivated supplier.
    #[error("Supplier {0} is deactivated")]
    SupplierInactive(String),

    /// The cashier account is deactivated.
    #[error("User {0} is deactivated")]
    UserInactive(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// The same id appears twice where it must be unique.
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
