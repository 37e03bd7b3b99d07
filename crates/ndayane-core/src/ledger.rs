//! # Payment Ledger Rules
//!
//! How payments move sale statuses and client balances.
//!
//! ## Client Balance Sign
//! ```text
//!        credit held by client          client owes the shop
//!   ◄────────────────────────── 0 ──────────────────────────►
//!        balance < 0                    balance > 0
//!
//!   deposit (ACOMPTE)      : balance − amount
//!   debt settlement        : balance − amount
//!   spend credit (CREDIT)  : balance + amount   (only up to the credit held)
//!   payment at the counter : no balance change
//! ```
//!
//! Every payment row stores the signed `balance_effect` it applied, so the
//! cached balance can always be rebuilt as
//! `opening_balance + Σ balance_effect`.

use serde::Serialize;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{PaymentType, SaleStatus};

// =============================================================================
// Sale Status
// =============================================================================

/// Status a sale should have given what has been paid against it.
///
/// ## Rules
/// - nothing paid → status unchanged
/// - paid ≥ total → `PAYEE`
/// - 0 < paid < total → `PARTIELLE`
/// - cancelled sales never move
///
/// Pure function of its inputs, so applying it twice changes nothing.
pub fn settlement_status(current: SaleStatus, total: Money, paid: Money) -> SaleStatus {
    if current == SaleStatus::Cancelled || !paid.is_positive() {
        return current;
    }

    if paid >= total {
        SaleStatus::Paid
    } else {
        SaleStatus::PartiallyPaid
    }
}

/// What is left to pay on a sale, never negative.
pub fn amount_due(total: Money, paid: Money) -> Money {
    (total - paid).non_negative()
}

// =============================================================================
// Client Credit
// =============================================================================

/// Credit the client can spend: `max(0, −balance)`.
pub fn available_credit(balance: Money) -> Money {
    (-balance).non_negative()
}

/// Checks that `requested` can be paid out of the client's credit.
///
/// ## Errors
/// - validation error when `requested` is not positive
/// - [`CoreError::InsufficientCredit`] when it exceeds [`available_credit`]
pub fn check_credit_usage(balance: Money, requested: Money) -> CoreResult<()> {
    crate::validation::validate_payment_amount(requested)?;

    let available = available_credit(balance);
    if requested > available {
        return Err(CoreError::InsufficientCredit {
            available,
            requested,
        });
    }

    Ok(())
}

// =============================================================================
// Balance Effects
// =============================================================================

/// Balance effect of a deposit: the shop now holds `amount` for the client.
pub fn deposit_effect(amount: Money) -> Money {
    -amount
}

/// Balance effect of paying a sale out of held credit.
pub fn credit_use_effect(amount: Money) -> Money {
    amount
}

/// Balance effect of a payment recorded through the generic entry point.
///
/// Only a client payment that is not tied to a sale and is not a deposit
/// settles debt. Everything else leaves the balance alone.
pub fn payment_effect(
    payment_type: PaymentType,
    has_sale: bool,
    has_client: bool,
    amount: Money,
) -> Money {
    if has_client && !has_sale && payment_type != PaymentType::Deposit {
        -amount
    } else {
        Money::zero()
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Result of comparing a cached balance with the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct BalanceDrift {
    pub client_id: String,
    pub stored: Money,
    pub computed: Money,
    /// `stored − computed`, zero when the cache is right.
    pub drift: Money,
}

impl BalanceDrift {
    pub fn new(client_id: impl Into<String>, stored: Money, opening: Money, effects: Money) -> Self {
        let computed = opening + effects;
        BalanceDrift {
            client_id: client_id.into(),
            stored,
            computed,
            drift: stored - computed,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.drift.is_zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
