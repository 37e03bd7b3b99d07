//! # Document Numbering
//!
//! Human-readable numbers printed on sales, purchase orders and invoices.
//!
//! ```text
//!   VT 2026 10 0001
//!   ── ──── ── ────
//!   │   │   │   └── sequence within the month, zero padded to 4 digits
//!   │   │   └────── month (2 digits)
//!   │   └────────── year
//!   └────────────── document kind: VT sale, BC purchase order, FA invoice
//! ```
//!
//! The counter for each `kind + yyyymm` key lives in the database and is
//! incremented atomically; this module only builds keys and formats numbers.

use chrono::{DateTime, Datelike, Utc};

/// Kind of numbered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Vente
    Sale,
    /// Bon de commande
    PurchaseOrder,
    /// Facture
    Invoice,
}

impl DocumentKind {
    pub const fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Sale => "VT",
            DocumentKind::PurchaseOrder => "BC",
            DocumentKind::Invoice => "FA",
        }
    }
}

/// Counter key for a document kind and month, e.g. `VT202610`.
pub fn sequence_key(kind: DocumentKind, at: DateTime<Utc>) -> String {
    format!("{}{:04}{:02}", kind.prefix(), at.year(), at.month())
}

/// Full document number from a counter key and its value.
///
/// Values past 9999 keep all their digits.
///
/// ## Example
/// ```rust
/// use ndayane_core::numbering::format_number;
///
/// assert_eq!(format_number("VT202610", 1), "VT2026100001");
/// assert_eq!(format_number("BC202610", 12345), "BC20261012345");
/// ```
pub fn format_number(key: &str, value: i64) -> String {
    format!("{}{:04}", key, value)
}

/// Reference stored on the payment created at checkout.
pub fn checkout_payment_reference(sale_number: &str) -> String {
    format!("PAY-{}", sale_number)
}
