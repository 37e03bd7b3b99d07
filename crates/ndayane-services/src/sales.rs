//! # Sales Service
//!
//! Checkout ("caisse"): creating, validating and cancelling sales.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Sale Lifecycle                                  │
//! │                                                                         │
//! │  create(payment_mode = None)          create(payment_mode = Some)       │
//! │         │                                      │                        │
//! │         ▼                                      ▼                        │
//! │   ┌────────────┐   validate(warehouse)   ┌───────────┐                  │
//! │   │ EN_ATTENTE │ ──────────────────────► │  VALIDEE  │ ◄─ stock taken   │
//! │   └─────┬──────┘                         └─────┬─────┘    payment row   │
//! │         │                                      │          (checkout)    │
//! │         │                                payments ──► PARTIELLE/PAYEE   │
//! │         │                                      │                        │
//! │         └──────────────── cancel ──────────────┴──► ANNULEE             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## create() in one transaction
//! 1. cashier active, client exists
//! 2. one batch price lookup, line totals, subtotal, total
//! 3. sale number from the `VT<yyyymm>` sequence
//! 4. with a payment mode: resolve warehouse, decrement each stocked line,
//!    one payment of the total with reference `PAY-<number>`
//!
//! Any error drops the transaction, so nothing is half-written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use crate::config::MissingStockPolicy;
use crate::error::{ServiceError, ServiceResult};
use ndayane_core::ledger::amount_due;
use ndayane_core::numbering::{checkout_payment_reference, DocumentKind};
use ndayane_core::pricing::{self, PriceBook, PriceEntry, SaleLineInput};
use ndayane_core::validation::validate_discount;
use ndayane_core::{
    Client, CoreError, Money, Payment, PaymentMode, PaymentType, Sale, SaleLine, SaleStatus,
    StockMovement, StockMovementReason, Warehouse,
};
use ndayane_db::repository::sale::SaleFilter;
use ndayane_db::{Database, DbError};

// =============================================================================
// Requests & Responses
// =============================================================================

/// A sale as submitted from the counter. The cashier comes from the session.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct CreateSaleRequest {
    #[serde(default)]
    pub client_id: Option<String>,
    pub lines: Vec<SaleLineInput>,
    /// Overall discount, defaults to zero.
    #[serde(default)]
    pub discount: Option<Money>,
    /// Paid at the counter. Without it the sale is held (`EN_ATTENTE`).
    #[serde(default)]
    pub payment_mode: Option<PaymentMode>,
    #[serde(default)]
    pub payment_type: Option<PaymentType>,
    /// Warehouse the goods leave from; the principal one when absent.
    #[serde(default)]
    pub warehouse_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A sale with everything a receipt or a detail screen needs.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct SaleDetails {
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
    pub client: Option<Client>,
    pub payments: Vec<Payment>,
    pub amount_paid: Money,
    pub amount_due: Money,
}

// =============================================================================
// Service
// =============================================================================

#[derive(Debug, Clone)]
pub struct SalesService {
    db: Database,
    missing_stock: MissingStockPolicy,
}

impl SalesService {
    pub fn new(db: Database, missing_stock: MissingStockPolicy) -> Self {
        SalesService { db, missing_stock }
    }

    /// Creates a sale, taking stock and payment when a payment mode is given.
    pub async fn create(
        &self,
        request: CreateSaleRequest,
        cashier_id: &str,
    ) -> ServiceResult<SaleDetails> {
        debug!(
            cashier_id = %cashier_id,
            lines = request.lines.len(),
            mode = ?request.payment_mode,
            "Creating sale"
        );

        pricing::validate_lines(&request.lines)?;
        let discount = request.discount.unwrap_or_default();
        validate_discount(discount)?;

        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        let cashier = self
            .db
            .users()
            .get_by_id(&mut tx, cashier_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", cashier_id))?;
        if !cashier.is_active {
            return Err(CoreError::UserInactive(cashier.username).into());
        }

        if let Some(client_id) = request.client_id.as_deref() {
            if self.db.clients().get_by_id(&mut tx, client_id).await?.is_none() {
                return Err(ServiceError::not_found("Client", client_id));
            }
        }

        // One lookup for every product on the sale
        let ids = pricing::product_ids(&request.lines);
        let book: PriceBook = self
            .db
            .products()
            .get_many(&mut tx, &ids)
            .await?
            .into_iter()
            .map(|p| {
                (
                    p.id,
                    PriceEntry {
                        name: p.name,
                        sale_price: p.sale_price,
                        is_active: p.is_active,
                    },
                )
            })
            .collect();

        let priced = pricing::price_lines(&request.lines, &book)?;
        let totals = pricing::compute_totals(&priced, discount)?;

        let number = self
            .db
            .sequences()
            .next_number(&mut tx, DocumentKind::Sale, now)
            .await?;

        let warehouse = match request.payment_mode {
            Some(_) => Some(
                self.db
                    .warehouses()
                    .resolve(&mut tx, request.warehouse_id.as_deref())
                    .await?,
            ),
            None => None,
        };

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            number: number.clone(),
            client_id: request.client_id.clone(),
            user_id: cashier.id.clone(),
            subtotal: totals.subtotal,
            discount: totals.discount,
            total: totals.total,
            status: if request.payment_mode.is_some() {
                SaleStatus::Validated
            } else {
                SaleStatus::Pending
            },
            payment_mode: request.payment_mode,
            warehouse_id: warehouse.as_ref().map(|w| w.id.clone()),
            notes: request.notes.clone(),
            created_at: now,
            updated_at: now,
            validated_at: warehouse.as_ref().map(|_| now),
        };
        self.db.sales().insert(&mut tx, &sale).await?;

        let mut lines = Vec::with_capacity(priced.len());
        for line in priced {
            let line = SaleLine {
                id: Uuid::new_v4().to_string(),
                sale_id: sale.id.clone(),
                product_id: line.product_id,
                product_name: line.product_name,
                quantity: line.quantity,
                unit_price: line.unit_price,
                discount: line.discount,
                line_total: line.line_total,
                created_at: now,
            };
            self.db.sales().insert_line(&mut tx, &line).await?;
            lines.push(line);
        }

        if let (Some(mode), Some(warehouse)) = (request.payment_mode, warehouse.as_ref()) {
            self.take_stock(&mut tx, &sale, &lines, warehouse, self.missing_stock, now)
                .await?;

            if sale.total.is_positive() {
                let payment = Payment {
                    id: Uuid::new_v4().to_string(),
                    sale_id: Some(sale.id.clone()),
                    client_id: sale.client_id.clone(),
                    amount: sale.total,
                    mode,
                    payment_type: request.payment_type.unwrap_or_default(),
                    reference: Some(checkout_payment_reference(&number)),
                    notes: None,
                    balance_effect: Money::zero(),
                    created_at: now,
                };
                self.db.payments().insert(&mut tx, &payment).await?;
            } else {
                debug!(number = %number, "Fully discounted sale, no checkout payment");
            }
        }

        let details = load_details(&self.db, &mut tx, sale).await?;
        tx.commit().await?;

        info!(
            number = %details.sale.number,
            status = %details.sale.status,
            total = %details.sale.total,
            lines = details.lines.len(),
            "Sale created"
        );

        Ok(details)
    }

    /// Validates a held sale, taking its stock from the given warehouse.
    ///
    /// Unlike checkout, a line without a stock row fails the whole validation.
    pub async fn validate(&self, sale_id: &str, warehouse_id: &str) -> ServiceResult<SaleDetails> {
        debug!(sale_id = %sale_id, warehouse_id = %warehouse_id, "Validating sale");

        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        let sale = self.require(&mut tx, sale_id).await?;
        if sale.status != SaleStatus::Pending {
            return Err(CoreError::InvalidSaleStatus {
                number: sale.number,
                current: sale.status.to_string(),
                operation: "validated".to_string(),
            }
            .into());
        }

        let warehouse = self
            .db
            .warehouses()
            .get_by_id(&mut tx, warehouse_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Warehouse", warehouse_id))?;
        let lines = self.db.sales().get_lines(&mut tx, &sale.id).await?;

        self.take_stock(
            &mut tx,
            &sale,
            &lines,
            &warehouse,
            MissingStockPolicy::Reject,
            now,
        )
        .await?;

        self.db
            .sales()
            .mark_validated(&mut tx, &sale.id, &warehouse.id, now)
            .await?;

        let sale = self.require(&mut tx, sale_id).await?;
        let details = load_details(&self.db, &mut tx, sale).await?;
        tx.commit().await?;

        info!(number = %details.sale.number, warehouse = %warehouse.name, "Sale validated");
        Ok(details)
    }

    /// Marks a sale `ANNULEE`.
    ///
    /// Stock taken and payments recorded are left as they are.
    pub async fn cancel(&self, sale_id: &str) -> ServiceResult<SaleDetails> {
        let mut tx = self.db.pool().begin().await?;

        let sale = self.require(&mut tx, sale_id).await?;
        self.db
            .sales()
            .update_status(&mut tx, &sale.id, SaleStatus::Cancelled, Utc::now())
            .await?;

        let sale = self.require(&mut tx, sale_id).await?;
        let details = load_details(&self.db, &mut tx, sale).await?;
        tx.commit().await?;

        info!(number = %details.sale.number, "Sale cancelled");
        Ok(details)
    }

    pub async fn get(&self, sale_id: &str) -> ServiceResult<SaleDetails> {
        let mut conn = self.db.pool().acquire().await?;
        let sale = self.require(&mut conn, sale_id).await?;
        load_details(&self.db, &mut conn, sale).await
    }

    pub async fn get_by_number(&self, number: &str) -> ServiceResult<SaleDetails> {
        let mut conn = self.db.pool().acquire().await?;
        let sale = self
            .db
            .sales()
            .get_by_number(&mut conn, number)
            .await?
            .ok_or_else(|| ServiceError::not_found("Sale", number))?;
        load_details(&self.db, &mut conn, sale).await
    }

    /// Sales by status, client and date range, newest first.
    pub async fn list(&self, filter: &SaleFilter) -> ServiceResult<Vec<Sale>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(self.db.sales().list(&mut conn, filter).await?)
    }

    async fn require(&self, conn: &mut SqliteConnection, sale_id: &str) -> ServiceResult<Sale> {
        self.db
            .sales()
            .get_by_id(conn, sale_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Sale", sale_id))
    }

    /// Decrements each line from `warehouse` and journals a `VENTE` movement.
    ///
    /// Returns the number of lines that moved stock.
    async fn take_stock(
        &self,
        conn: &mut SqliteConnection,
        sale: &Sale,
        lines: &[SaleLine],
        warehouse: &Warehouse,
        policy: MissingStockPolicy,
        now: DateTime<Utc>,
    ) -> ServiceResult<usize> {
        let mut moved = 0;

        for line in lines {
            let remaining = self
                .db
                .stock()
                .decrement_existing(conn, &line.product_id, &warehouse.id, line.quantity, now)
                .await?;

            match remaining {
                Some(quantity) => {
                    if quantity < 0 {
                        warn!(
                            product_id = %line.product_id,
                            warehouse = %warehouse.name,
                            quantity,
                            "Stock went negative"
                        );
                    }

                    self.db
                        .stock()
                        .record_movement(
                            conn,
                            &StockMovement {
                                id: Uuid::new_v4().to_string(),
                                product_id: line.product_id.clone(),
                                warehouse_id: warehouse.id.clone(),
                                delta: -line.quantity,
                                reason: StockMovementReason::Sale,
                                reference: Some(sale.number.clone()),
                                created_at: now,
                            },
                        )
                        .await?;
                    moved += 1;
                }
                None => match policy {
                    MissingStockPolicy::Skip => {
                        warn!(
                            number = %sale.number,
                            product_id = %line.product_id,
                            warehouse = %warehouse.name,
                            "No stock row, line treated as unstocked"
                        );
                    }
                    MissingStockPolicy::Reject => {
                        return Err(DbError::not_found(
                            "Stock",
                            format!("{} in warehouse {}", line.product_name, warehouse.name),
                        )
                        .into());
                    }
                },
            }
        }

        Ok(moved)
    }
}

/// Loads lines, client and payments around a sale.
pub(crate) async fn load_details(
    db: &Database,
    conn: &mut SqliteConnection,
    sale: Sale,
) -> ServiceResult<SaleDetails> {
    let lines = db.sales().get_lines(conn, &sale.id).await?;
    let client = match sale.client_id.as_deref() {
        Some(id) => db.clients().get_by_id(conn, id).await?,
        None => None,
    };
    let payments = db.payments().list_for_sale(conn, &sale.id).await?;
    let amount_paid: Money = payments.iter().map(|p| p.amount).sum();

    Ok(SaleDetails {
        amount_due: amount_due(sale.total, amount_paid),
        sale,
        lines,
        client,
        payments,
        amount_paid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support;

    fn line(product_id: &str, quantity: i64) -> SaleLineInput {
        SaleLineInput {
            product_id: product_id.to_string(),
            quantity,
            unit_price: None,
            discount: None,
        }
    }

    #[tokio::test]
    async fn test_cash_sale_takes_stock_and_payment() {
        let shop = test_support::shop().await;
        let vis = shop.product("VIS-6X40", 1000).await;
        let cheville = shop.product("CHEV-8", 500).await;
        shop.stock(&vis.id, &shop.principal.id, 20).await;
        shop.stock(&cheville.id, &shop.principal.id, 10).await;

        let service = SalesService::new(shop.db.clone(), MissingStockPolicy::Skip);
        let details = service
            .create(
                CreateSaleRequest {
                    lines: vec![line(&vis.id, 3), line(&cheville.id, 1)],
                    payment_mode: Some(PaymentMode::Cash),
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap();

        let sale = &details.sale;
        assert_eq!(sale.subtotal, Money::new(3500));
        assert_eq!(sale.total, Money::new(3500));
        assert_eq!(sale.status, SaleStatus::Validated);
        assert_eq!(sale.warehouse_id.as_deref(), Some(shop.principal.id.as_str()));
        assert!(sale.validated_at.is_some());

        assert_eq!(details.payments.len(), 1);
        let payment = &details.payments[0];
        assert_eq!(payment.amount, Money::new(3500));
        assert_eq!(payment.mode, PaymentMode::Cash);
        assert_eq!(payment.payment_type, PaymentType::Settlement);
        assert_eq!(payment.reference, Some(format!("PAY-{}", sale.number)));
        assert_eq!(payment.balance_effect, Money::zero());

        assert_eq!(shop.level(&vis.id, &shop.principal.id).await, Some(17));
        assert_eq!(shop.level(&cheville.id, &shop.principal.id).await, Some(9));
        assert_eq!(details.amount_due, Money::zero());
    }

    #[tokio::test]
    async fn test_fully_discounted_cash_sale() {
        let shop = test_support::shop().await;
        let vis = shop.product("VIS-6X40", 1000).await;
        shop.stock(&vis.id, &shop.principal.id, 5).await;

        let service = SalesService::new(shop.db.clone(), MissingStockPolicy::Skip);
        let details = service
            .create(
                CreateSaleRequest {
                    lines: vec![line(&vis.id, 1)],
                    discount: Some(Money::new(1000)),
                    payment_mode: Some(PaymentMode::Cash),
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap();

        assert_eq!(details.sale.status, SaleStatus::Validated);
        assert_eq!(details.sale.total, Money::zero());
        assert!(details.payments.is_empty());
        assert_eq!(details.amount_due, Money::zero());
        assert_eq!(shop.payment_count().await, 0);
        assert_eq!(shop.level(&vis.id, &shop.principal.id).await, Some(4));
    }

    #[tokio::test]
    async fn test_huge_unit_price_rejected() {
        let shop = test_support::shop().await;
        let vis = shop.product("VIS-6X40", 1000).await;

        let service = SalesService::new(shop.db.clone(), MissingStockPolicy::Skip);
        let err = service
            .create(
                CreateSaleRequest {
                    lines: vec![SaleLineInput {
                        unit_price: Some(Money::new(i64::MAX / 2)),
                        ..line(&vis.id, 3)
                    }],
                    payment_mode: Some(PaymentMode::Cash),
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(shop.sale_count().await, 0);
        assert_eq!(shop.payment_count().await, 0);
    }

    #[tokio::test]
    async fn test_totals_with_discounts_and_price_override() {
        let shop = test_support::shop().await;
        let tube = shop.product("TUBE-32", 2500).await;
        let service = SalesService::new(shop.db.clone(), MissingStockPolicy::Skip);

        let details = service
            .create(
                CreateSaleRequest {
                    lines: vec![
                        SaleLineInput {
                            product_id: tube.id.clone(),
                            quantity: 4,
                            unit_price: Some(Money::new(2000)),
                            discount: Some(Money::new(500)),
                        },
                        line(&tube.id, 1),
                    ],
                    discount: Some(Money::new(1000)),
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap();

        // (4 × 2000 − 500) + 1 × 2500
        assert_eq!(details.sale.subtotal, Money::new(10_000));
        assert_eq!(details.sale.total, Money::new(9_000));
        assert_eq!(details.lines[0].line_total, Money::new(7_500));
        assert_eq!(details.lines[1].unit_price, Money::new(2500));
    }

    #[tokio::test]
    async fn test_held_sale_has_no_side_effects() {
        let shop = test_support::shop().await;
        let vis = shop.product("VIS-6X40", 1000).await;
        shop.stock(&vis.id, &shop.principal.id, 20).await;

        let service = SalesService::new(shop.db.clone(), MissingStockPolicy::Skip);
        let details = service
            .create(
                CreateSaleRequest {
                    lines: vec![line(&vis.id, 2)],
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap();

        assert_eq!(details.sale.status, SaleStatus::Pending);
        assert!(details.sale.warehouse_id.is_none());
        assert!(details.payments.is_empty());
        assert_eq!(shop.level(&vis.id, &shop.principal.id).await, Some(20));
        assert_eq!(shop.payment_count().await, 0);
    }

    #[tokio::test]
    async fn test_sale_numbers_are_sequential() {
        let shop = test_support::shop().await;
        let vis = shop.product("VIS-6X40", 1000).await;
        let service = SalesService::new(shop.db.clone(), MissingStockPolicy::Skip);

        let request = || CreateSaleRequest {
            lines: vec![line(&vis.id, 1)],
            ..Default::default()
        };
        let first = service.create(request(), &shop.cashier.id).await.unwrap();
        let second = service.create(request(), &shop.cashier.id).await.unwrap();

        let prefix = format!("VT{}", Utc::now().format("%Y%m"));
        assert_eq!(first.sale.number, format!("{prefix}0001"));
        assert_eq!(second.sale.number, format!("{prefix}0002"));
    }

    #[tokio::test]
    async fn test_missing_stock_row_policies() {
        let shop = test_support::shop().await;
        let stocked = shop.product("VIS-6X40", 1000).await;
        let service_item = shop.product("DECOUPE", 500).await;
        shop.stock(&stocked.id, &shop.principal.id, 5).await;

        let request = || CreateSaleRequest {
            lines: vec![line(&stocked.id, 1), line(&service_item.id, 1)],
            payment_mode: Some(PaymentMode::MobileMoney),
            ..Default::default()
        };

        let rejecting = SalesService::new(shop.db.clone(), MissingStockPolicy::Reject);
        let err = rejecting.create(request(), &shop.cashier.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        // Rolled back: no sale, no payment, stock untouched
        assert_eq!(shop.sale_count().await, 0);
        assert_eq!(shop.payment_count().await, 0);
        assert_eq!(shop.level(&stocked.id, &shop.principal.id).await, Some(5));

        let skipping = SalesService::new(shop.db.clone(), MissingStockPolicy::Skip);
        let details = skipping.create(request(), &shop.cashier.id).await.unwrap();
        assert_eq!(details.sale.status, SaleStatus::Validated);
        assert_eq!(shop.level(&stocked.id, &shop.principal.id).await, Some(4));
        assert_eq!(shop.level(&service_item.id, &shop.principal.id).await, None);
    }

    #[tokio::test]
    async fn test_stock_may_go_negative() {
        let shop = test_support::shop().await;
        let vis = shop.product("VIS-6X40", 1000).await;
        shop.stock(&vis.id, &shop.principal.id, 1).await;

        let service = SalesService::new(shop.db.clone(), MissingStockPolicy::Skip);
        service
            .create(
                CreateSaleRequest {
                    lines: vec![line(&vis.id, 3)],
                    payment_mode: Some(PaymentMode::Cash),
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap();

        assert_eq!(shop.level(&vis.id, &shop.principal.id).await, Some(-2));
    }

    #[tokio::test]
    async fn test_rejections() {
        let shop = test_support::shop().await;
        let vis = shop.product("VIS-6X40", 1000).await;
        let service = SalesService::new(shop.db.clone(), MissingStockPolicy::Skip);

        // Empty sale
        let err = service
            .create(CreateSaleRequest::default(), &shop.cashier.id)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        // Discount larger than subtotal
        let err = service
            .create(
                CreateSaleRequest {
                    lines: vec![line(&vis.id, 1)],
                    discount: Some(Money::new(1500)),
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessRule);

        // Unknown cashier, unknown client, unknown product
        let ok_lines = || vec![line(&vis.id, 1)];
        let err = service
            .create(
                CreateSaleRequest {
                    lines: ok_lines(),
                    ..Default::default()
                },
                "nobody",
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = service
            .create(
                CreateSaleRequest {
                    lines: ok_lines(),
                    client_id: Some("ghost".to_string()),
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = service
            .create(
                CreateSaleRequest {
                    lines: vec![line("missing-product", 1)],
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        // Deactivated cashier
        {
            let mut conn = shop.db.pool().acquire().await.unwrap();
            shop.db
                .users()
                .set_active(&mut conn, &shop.cashier.id, false)
                .await
                .unwrap();
        }
        let err = service
            .create(
                CreateSaleRequest {
                    lines: ok_lines(),
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessRule);

        assert_eq!(shop.sale_count().await, 0);
    }

    #[tokio::test]
    async fn test_no_principal_warehouse() {
        let shop = test_support::shop().await;
        let vis = shop.product("VIS-6X40", 1000).await;
        {
            let mut conn = shop.db.pool().acquire().await.unwrap();
            sqlx::query("UPDATE warehouses SET is_principal = 0")
                .execute(&mut *conn)
                .await
                .unwrap();
        }

        let service = SalesService::new(shop.db.clone(), MissingStockPolicy::Skip);
        let err = service
            .create(
                CreateSaleRequest {
                    lines: vec![line(&vis.id, 1)],
                    payment_mode: Some(PaymentMode::Cash),
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(shop.sale_count().await, 0);
    }

    #[tokio::test]
    async fn test_validate_held_sale() {
        let shop = test_support::shop().await;
        let vis = shop.product("VIS-6X40", 1000).await;
        shop.stock(&vis.id, &shop.principal.id, 10).await;

        let service = SalesService::new(shop.db.clone(), MissingStockPolicy::Skip);
        let held = service
            .create(
                CreateSaleRequest {
                    lines: vec![line(&vis.id, 4)],
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap();

        let validated = service
            .validate(&held.sale.id, &shop.principal.id)
            .await
            .unwrap();
        assert_eq!(validated.sale.status, SaleStatus::Validated);
        assert!(validated.sale.validated_at.is_some());
        assert_eq!(validated.sale.warehouse_id.as_deref(), Some(shop.principal.id.as_str()));
        assert_eq!(shop.level(&vis.id, &shop.principal.id).await, Some(6));

        // Second validation refused
        let err = service
            .validate(&held.sale.id, &shop.principal.id)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessRule);
        assert!(err.message.contains("cannot be validated"));
        assert_eq!(shop.level(&vis.id, &shop.principal.id).await, Some(6));
    }

    #[tokio::test]
    async fn test_validate_rolls_back_on_missing_row() {
        let shop = test_support::shop().await;
        let stocked = shop.product("VIS-6X40", 1000).await;
        let unstocked = shop.product("CHEV-8", 500).await;
        shop.stock(&stocked.id, &shop.principal.id, 10).await;

        let service = SalesService::new(shop.db.clone(), MissingStockPolicy::Skip);
        let held = service
            .create(
                CreateSaleRequest {
                    lines: vec![line(&stocked.id, 2), line(&unstocked.id, 1)],
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap();

        let err = service
            .validate(&held.sale.id, &shop.principal.id)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let after = service.get(&held.sale.id).await.unwrap();
        assert_eq!(after.sale.status, SaleStatus::Pending);
        assert_eq!(shop.level(&stocked.id, &shop.principal.id).await, Some(10));

        let err = service
            .validate(&held.sale.id, "no-such-warehouse")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(err.message.contains("Warehouse"));
        assert_eq!(
            service.get(&held.sale.id).await.unwrap().sale.status,
            SaleStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_cancel_keeps_stock_and_payments() {
        let shop = test_support::shop().await;
        let vis = shop.product("VIS-6X40", 1000).await;
        shop.stock(&vis.id, &shop.principal.id, 10).await;

        let service = SalesService::new(shop.db.clone(), MissingStockPolicy::Skip);
        let sale = service
            .create(
                CreateSaleRequest {
                    lines: vec![line(&vis.id, 2)],
                    payment_mode: Some(PaymentMode::Card),
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap();

        let cancelled = service.cancel(&sale.sale.id).await.unwrap();
        assert_eq!(cancelled.sale.status, SaleStatus::Cancelled);
        assert_eq!(cancelled.payments.len(), 1);
        assert_eq!(shop.level(&vis.id, &shop.principal.id).await, Some(8));

        assert!(service.cancel("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_and_lookup() {
        let shop = test_support::shop().await;
        let vis = shop.product("VIS-6X40", 1000).await;
        let service = SalesService::new(shop.db.clone(), MissingStockPolicy::Skip);

        let held = service
            .create(
                CreateSaleRequest {
                    lines: vec![line(&vis.id, 1)],
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap();
        service
            .create(
                CreateSaleRequest {
                    lines: vec![line(&vis.id, 1)],
                    payment_mode: Some(PaymentMode::Cash),
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap();

        let pending = service
            .list(&SaleFilter {
                status: Some(SaleStatus::Pending),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, held.sale.id);

        let all = service.list(&SaleFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let by_number = service.get_by_number(&held.sale.number).await.unwrap();
        assert_eq!(by_number.sale.id, held.sale.id);
    }
}
