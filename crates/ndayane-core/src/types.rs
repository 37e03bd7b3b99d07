//! # Domain Types
//!
//! Core domain types used throughout Ndayane POS.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog & stock        Counter                 Ledger                  │
//! │  ─────────────────      ─────────────────       ─────────────────       │
//! │  Product                Sale ──► SaleLine       Payment                 │
//! │  Warehouse              SaleStatus              PaymentMode             │
//! │  StockLevel                                     PaymentType             │
//! │  StockMovement                                  Client.balance          │
//! │                                                                         │
//! │  Purchasing             People                                          │
//! │  ─────────────────      ─────────────────                               │
//! │  Supplier               User / UserRole                                 │
//! │  PurchaseOrder ──► PurchaseOrderLine                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Codes
//! Status and mode enums serialise to the shop's French business codes
//! (`EN_ATTENTE`, `VALIDEE`, `ESPECES`, `ACOMPTE`, ...). The same codes are
//! stored in SQLite.
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where relevant: (`reference`, sale `number`, order `number`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A catalog product. Never deleted, only deactivated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    /// Business code printed on shelves and invoices.
    pub reference: String,
    pub name: String,
    pub purchase_price: Money,
    pub sale_price: Money,
    /// Selling unit ("pièce", "sac", "m", ...).
    pub unit: String,
    /// Alert threshold across all warehouses.
    pub min_stock: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Warehouses & Stock
// =============================================================================

/// A stock location (dépôt). At most one is flagged principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Warehouse {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    pub is_principal: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Quantity of one product in one warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLevel {
    pub id: String,
    pub product_id: String,
    pub warehouse_id: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Why a stock quantity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum StockMovementReason {
    #[serde(rename = "VENTE")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "VENTE"))]
    Sale,
    #[serde(rename = "RECEPTION")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "RECEPTION"))]
    Receipt,
    #[serde(rename = "AJUSTEMENT")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "AJUSTEMENT"))]
    Adjustment,
    #[serde(rename = "TRANSFERT_SORTIE")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "TRANSFERT_SORTIE"))]
    TransferOut,
    #[serde(rename = "TRANSFERT_ENTREE")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "TRANSFERT_ENTREE"))]
    TransferIn,
}

/// Append-only audit row for every stock change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub warehouse_id: String,
    /// Signed change: negative for sales and transfers out.
    pub delta: i64,
    pub reason: StockMovementReason,
    /// Sale number, order number or free text.
    pub reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
///
/// ```text
/// EN_ATTENTE ──valider──► VALIDEE ──payments──► PARTIELLE ──► PAYEE
///     │
///     └──── created with a payment mode goes straight to VALIDEE
///
/// any ──annuler──► ANNULEE
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum SaleStatus {
    /// Held order or quote: no stock or payment effect yet.
    #[default]
    #[serde(rename = "EN_ATTENTE")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "EN_ATTENTE"))]
    Pending,
    /// Validated at the counter, stock taken.
    #[serde(rename = "VALIDEE")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "VALIDEE"))]
    Validated,
    /// Some payments recorded, less than the total.
    #[serde(rename = "PARTIELLE")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "PARTIELLE"))]
    PartiallyPaid,
    /// Payments cover the total.
    #[serde(rename = "PAYEE")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "PAYEE"))]
    Paid,
    #[serde(rename = "ANNULEE")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "ANNULEE"))]
    Cancelled,
}

impl SaleStatus {
    /// Business code as stored and serialised.
    pub const fn code(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "EN_ATTENTE",
            SaleStatus::Validated => "VALIDEE",
            SaleStatus::PartiallyPaid => "PARTIELLE",
            SaleStatus::Paid => "PAYEE",
            SaleStatus::Cancelled => "ANNULEE",
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// Payment Mode & Type
// =============================================================================

/// How the money was handed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum PaymentMode {
    #[serde(rename = "ESPECES")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "ESPECES"))]
    Cash,
    #[serde(rename = "MOBILE_MONEY")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "MOBILE_MONEY"))]
    MobileMoney,
    #[serde(rename = "CHEQUE")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "CHEQUE"))]
    Check,
    #[serde(rename = "CARTE")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "CARTE"))]
    Card,
    /// Paid out of credit held on the client account.
    #[serde(rename = "CREDIT")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "CREDIT"))]
    Credit,
}

impl PaymentMode {
    pub const ALL: [PaymentMode; 5] = [
        PaymentMode::Cash,
        PaymentMode::MobileMoney,
        PaymentMode::Check,
        PaymentMode::Card,
        PaymentMode::Credit,
    ];

    pub const fn code(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "ESPECES",
            PaymentMode::MobileMoney => "MOBILE_MONEY",
            PaymentMode::Check => "CHEQUE",
            PaymentMode::Card => "CARTE",
            PaymentMode::Credit => "CREDIT",
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Parses the codes used by the counter screens.
///
/// Accepts the business code (`ESPECES`) and the everyday English word
/// (`cash`), case-insensitively.
impl FromStr for PaymentMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace(['-', ' '], "_").as_str() {
            "ESPECES" | "CASH" => Ok(PaymentMode::Cash),
            "MOBILE_MONEY" | "MOBILE" => Ok(PaymentMode::MobileMoney),
            "CHEQUE" | "CHECK" => Ok(PaymentMode::Check),
            "CARTE" | "CARD" => Ok(PaymentMode::Card),
            "CREDIT" => Ok(PaymentMode::Credit),
            _ => Err(ValidationError::NotAllowed {
                field: "payment mode".to_string(),
                allowed: PaymentMode::ALL.iter().map(|m| m.code().to_string()).collect(),
            }),
        }
    }
}

/// Deposit on account vs settlement of something owed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum PaymentType {
    #[serde(rename = "ACOMPTE")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "ACOMPTE"))]
    Deposit,
    #[default]
    #[serde(rename = "REGLEMENT")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "REGLEMENT"))]
    Settlement,
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PaymentType::Deposit => "ACOMPTE",
            PaymentType::Settlement => "REGLEMENT",
        })
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A sale at the counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Human-readable number, e.g. `VT2026100001`.
    pub number: String,
    pub client_id: Option<String>,
    /// Cashier who rang the sale.
    pub user_id: String,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub status: SaleStatus,
    pub payment_mode: Option<PaymentMode>,
    /// Warehouse the stock was taken from, once taken.
    pub warehouse_id: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub validated_at: Option<DateTime<Utc>>,
}

/// A line of a sale. Product name and unit price are frozen at sale time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: Money,
    /// quantity × unit_price − discount
    pub line_total: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment
// =============================================================================

/// Append-only ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub sale_id: Option<String>,
    pub client_id: Option<String>,
    pub amount: Money,
    pub mode: PaymentMode,
    pub payment_type: PaymentType,
    pub reference: Option<String>,
    pub notes: Option<String>,
    /// Signed amount this row applied to the client balance.
    pub balance_effect: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Client
// =============================================================================

/// A customer account.
///
/// `balance > 0`: the client owes the shop. `balance < 0`: the shop holds
/// credit for the client (deposits not yet spent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    /// Balance carried over when the account was opened.
    pub opening_balance: Money,
    pub balance: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Supplier & Purchase Orders
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Status of a supplier order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum PurchaseOrderStatus {
    #[default]
    #[serde(rename = "EN_ATTENTE")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "EN_ATTENTE"))]
    Pending,
    /// Some goods received, not all.
    #[serde(rename = "PARTIELLE")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "PARTIELLE"))]
    PartiallyReceived,
    #[serde(rename = "LIVREE")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "LIVREE"))]
    Delivered,
    #[serde(rename = "ANNULEE")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "ANNULEE"))]
    Cancelled,
}

impl PurchaseOrderStatus {
    /// Goods can still arrive against this order.
    pub const fn is_open(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Pending | PurchaseOrderStatus::PartiallyReceived
        )
    }
}

impl fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PurchaseOrderStatus::Pending => "EN_ATTENTE",
            PurchaseOrderStatus::PartiallyReceived => "PARTIELLE",
            PurchaseOrderStatus::Delivered => "LIVREE",
            PurchaseOrderStatus::Cancelled => "ANNULEE",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseOrder {
    pub id: String,
    /// Human-readable number, e.g. `BC2026100003`.
    pub number: String,
    pub supplier_id: String,
    pub status: PurchaseOrderStatus,
    pub total: Money,
    pub notes: Option<String>,
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseOrderLine {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub ordered_quantity: i64,
    pub received_quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

impl PurchaseOrderLine {
    /// Quantity still expected from the supplier.
    pub fn outstanding(&self) -> i64 {
        (self.ordered_quantity - self.received_quantity).max(0)
    }

    pub fn is_fully_received(&self) -> bool {
        self.received_quantity >= self.ordered_quantity
    }
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum UserRole {
    #[serde(rename = "ADMIN")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "ADMIN"))]
    Admin,
    #[serde(rename = "GERANT")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "GERANT"))]
    Manager,
    #[serde(rename = "CAISSIER")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "CAISSIER"))]
    Cashier,
}

/// A back-office account. Credentials live with the out-of-scope auth layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub role: UserRole,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
