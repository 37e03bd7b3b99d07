//! # ndayane-services: Domain Services for Ndayane POS
//!
//! Every business operation of the back office, one transaction each.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Ndayane POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            HTTP layer / dashboard (not in this workspace)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ request structs                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ ndayane-services (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   sales      payments    purchasing   catalog    inventory     │   │
//! │  │   clients    suppliers   users        reports    invoices      │   │
//! │  │                                                                 │   │
//! │  │   config (TOML + env)    error (code + message)                 │   │
//! │  └──────────────┬──────────────────────────────┬───────────────────┘   │
//! │                 │                              │                        │
//! │  ┌──────────────▼──────────────┐  ┌────────────▼────────────────────┐  │
//! │  │  ndayane-core (pure rules)  │  │  ndayane-db (SQLite, repos)     │  │
//! │  └─────────────────────────────┘  └─────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transaction Pattern
//! ```rust,ignore
//! let mut tx = self.db.pool().begin().await?;
//! // validate, then write through the repositories
//! self.db.sales().insert(&mut tx, &sale).await?;
//! self.db.stock().decrement_existing(&mut tx, ...).await?;
//! tx.commit().await?;   // any `?` above drops tx → ROLLBACK
//! ```
//!
//! ## Example Usage
//! ```rust,ignore
//! use ndayane_services::{AppConfig, Services};
//!
//! let config = AppConfig::load(None)?;
//! let services = Services::open(&config).await?;
//! let sale = services.sales.create(request, &cashier_id).await?;
//! ```

pub mod catalog;
pub mod clients;
pub mod config;
pub mod error;
pub mod inventory;
pub mod invoices;
pub mod payments;
pub mod purchasing;
pub mod reports;
pub mod sales;
pub mod suppliers;
pub mod users;

pub use catalog::CatalogService;
pub use clients::ClientService;
pub use config::{AppConfig, MissingStockPolicy, StoreConfig};
pub use error::{ErrorCode, ServiceError, ServiceResult};
pub use inventory::InventoryService;
pub use invoices::InvoiceService;
pub use payments::PaymentsService;
pub use purchasing::PurchasingService;
pub use reports::ReportService;
pub use sales::SalesService;
pub use suppliers::SupplierService;
pub use users::UserService;

use ndayane_db::Database;
use tracing::info;

/// All services over one database.
///
/// Services are cheap to clone: each holds a clone of the pool handle.
#[derive(Debug, Clone)]
pub struct Services {
    pub catalog: CatalogService,
    pub inventory: InventoryService,
    pub sales: SalesService,
    pub payments: PaymentsService,
    pub purchasing: PurchasingService,
    pub clients: ClientService,
    pub suppliers: SupplierService,
    pub users: UserService,
    pub reports: ReportService,
    pub invoices: InvoiceService,
}

impl Services {
    pub fn new(db: Database, config: &AppConfig) -> Self {
        Services {
            catalog: CatalogService::new(db.clone()),
            inventory: InventoryService::new(db.clone()),
            sales: SalesService::new(db.clone(), config.sales.missing_stock),
            payments: PaymentsService::new(db.clone()),
            purchasing: PurchasingService::new(db.clone()),
            clients: ClientService::new(db.clone()),
            suppliers: SupplierService::new(db.clone()),
            users: UserService::new(db.clone()),
            reports: ReportService::new(db.clone()),
            invoices: InvoiceService::new(db, config.store.clone()),
        }
    }

    /// Opens the configured database (running migrations) and builds the services.
    pub async fn open(config: &AppConfig) -> ServiceResult<Self> {
        info!(path = ?config.database.path, "Opening database");
        let db = Database::new(config.db_config()).await?;
        Ok(Self::new(db, config))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::{DepositRequest, RecordPaymentRequest};
    use crate::sales::CreateSaleRequest;
    use ndayane_core::pricing::SaleLineInput;
    use ndayane_core::{Money, PaymentMode, SaleStatus};

    #[tokio::test]
    async fn test_held_sale_paid_from_deposit_then_cash() {
        let shop = test_support::shop().await;
        let services = Services::new(shop.db.clone(), &AppConfig::default());
        let brouette = shop.product("BROU-90L", 25_000).await;
        shop.stock(&brouette.id, &shop.principal.id, 4).await;
        let moussa = shop.client("Moussa Diop", 0).await;

        let held = services
            .sales
            .create(
                CreateSaleRequest {
                    client_id: Some(moussa.id.clone()),
                    lines: vec![SaleLineInput {
                        product_id: brouette.id.clone(),
                        quantity: 2,
                        unit_price: None,
                        discount: None,
                    }],
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap();
        assert_eq!(held.sale.status, SaleStatus::Pending);

        let deposit = services
            .payments
            .record_deposit(DepositRequest {
                client_id: Some(moussa.id.clone()),
                amount: Money::new(30_000),
                mode: PaymentMode::MobileMoney,
                reference: None,
                notes: None,
            })
            .await
            .unwrap();
        assert_eq!(deposit.client_balance, Some(Money::new(-30_000)));

        let validated = services
            .sales
            .validate(&held.sale.id, &shop.principal.id)
            .await
            .unwrap();
        assert_eq!(validated.sale.status, SaleStatus::Validated);
        assert_eq!(shop.level(&brouette.id, &shop.principal.id).await, Some(2));

        let credit = services
            .payments
            .use_credit(&moussa.id, &held.sale.id, Money::new(30_000))
            .await
            .unwrap();
        assert_eq!(credit.sale_status, Some(SaleStatus::PartiallyPaid));
        assert_eq!(credit.client_balance, Some(Money::zero()));

        let cash = services
            .payments
            .record(RecordPaymentRequest {
                sale_id: Some(held.sale.id.clone()),
                client_id: None,
                amount: Money::new(20_000),
                mode: PaymentMode::Cash,
                payment_type: None,
                reference: None,
                notes: None,
            })
            .await
            .unwrap();
        assert_eq!(cash.sale_status, Some(SaleStatus::Paid));

        let invoice = services.invoices.for_sale(&held.sale.id).await.unwrap();
        assert_eq!(invoice.total, Money::new(50_000));
        assert_eq!(invoice.amount_paid, Money::new(50_000));
        assert_eq!(invoice.balance_due, Money::zero());

        assert!(services.payments.reconcile_all().await.unwrap().is_empty());

        let dashboard = services.reports.dashboard().await.unwrap();
        assert_eq!(dashboard.today.revenue, Money::new(50_000));
        assert_eq!(dashboard.today.deposits, Money::new(30_000));
        assert_eq!(dashboard.credit_held, Money::zero());
    }
}
