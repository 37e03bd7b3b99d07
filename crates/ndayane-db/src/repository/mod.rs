//! # Repository Module
//!
//! Database repository implementations for Ndayane POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Service operation                                                     │
//! │       │                                                                 │
//! │       │  let mut tx = db.pool().begin().await?;                         │
//! │       │  db.stock().decrement_existing(&mut tx, ...)                    │
//! │       ▼                                                                 │
//! │  StockRepository (zero-sized, stateless)                               │
//! │  ├── get_level(&self, conn, product, warehouse)                        │
//! │  ├── decrement_existing(&self, conn, ...)                              │
//! │  └── add(&self, conn, ...)                                             │
//! │       │                                                                 │
//! │       │  SQL on the caller's connection / transaction                  │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Repositories never open their own transaction: the caller decides     │
//! │  what commits together.                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog
//! - [`WarehouseRepository`](warehouse::WarehouseRepository) - Dépôts, principal flag
//! - [`StockRepository`](stock::StockRepository) - Stock levels and movements
//! - [`SaleRepository`](sale::SaleRepository) - Sales and sale lines
//! - [`PaymentRepository`](payment::PaymentRepository) - Payment ledger
//! - [`ClientRepository`](client::ClientRepository) - Client accounts and balances
//! - [`SupplierRepository`](supplier::SupplierRepository) - Suppliers
//! - [`PurchaseOrderRepository`](purchase_order::PurchaseOrderRepository) - Supplier orders
//! - [`UserRepository`](user::UserRepository) - Back-office accounts
//! - [`SequenceRepository`](sequence::SequenceRepository) - Document numbers
//! - [`ReportRepository`](report::ReportRepository) - Aggregates for reports

pub mod client;
pub mod payment;
pub mod product;
pub mod purchase_order;
pub mod report;
pub mod sale;
pub mod sequence;
pub mod stock;
pub mod supplier;
pub mod user;
pub mod warehouse;

/// Test helpers shared by the repository tests.
#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use ndayane_core::{Money, Product, User, UserRole, Warehouse};
    use uuid::Uuid;

    use crate::{Database, DbConfig};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn product(reference: &str, sale_price: i64) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            reference: reference.to_string(),
            name: format!("Produit {}", reference),
            purchase_price: Money::new(sale_price / 2),
            sale_price: Money::new(sale_price),
            unit: "pièce".to_string(),
            min_stock: 5,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn warehouse(name: &str, is_principal: bool) -> Warehouse {
        Warehouse {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            location: None,
            is_principal,
            created_at: Utc::now(),
        }
    }

    pub fn cashier(username: &str) -> User {
        User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            full_name: "Awa Diop".to_string(),
            role: UserRole::Cashier,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
