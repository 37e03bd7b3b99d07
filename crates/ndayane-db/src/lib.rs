//! # ndayane-db: Database Layer for Ndayane POS
//!
//! This crate provides database access for the Ndayane back office.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Ndayane POS Data Flow                            │
//! │                                                                         │
//! │  SalesService::create()                                                │
//! │       │  let mut tx = db.pool().begin().await?;                         │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     ndayane-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (&mut conn)   │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │    │ SaleRepo      │    │ 001_initial_ │  │   │
//! │  │   │ Connection    │◄───│ PaymentRepo   │    │ schema.sql   │  │   │
//! │  │   │ Management    │    │ StockRepo ... │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per entity group
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ndayane_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("ndayane.db")).await?;
//!
//! let mut tx = db.pool().begin().await?;
//! let product = db.products().get_by_id(&mut tx, &id).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::client::ClientRepository;
pub use repository::payment::PaymentRepository;
pub use repository::product::ProductRepository;
pub use repository::purchase_order::PurchaseOrderRepository;
pub use repository::report::ReportRepository;
pub use repository::sale::SaleRepository;
pub use repository::sequence::SequenceRepository;
pub use repository::stock::StockRepository;
pub use repository::supplier::SupplierRepository;
pub use repository::user::UserRepository;
pub use repository::warehouse::WarehouseRepository;
