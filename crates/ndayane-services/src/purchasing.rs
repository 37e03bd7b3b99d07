//! # Purchasing Service
//!
//! Supplier orders (bons de commande) and receiving goods into the principal
//! warehouse.
//!
//! ## Receiving
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  receive(order, [{line, qty}])                    one transaction       │
//! │                                                                         │
//! │  order EN_ATTENTE or PARTIELLE? ── no ──► BUSINESS_RULE                 │
//! │        │                                                                │
//! │        ▼  for each entry                                                │
//! │  line belongs to order? ── no ──► NOT_FOUND (rolled back)               │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  received_quantity += qty                                               │
//! │  qty > 0 → principal stock += qty (row created if absent)               │
//! │            RECEPTION movement                                           │
//! │        │                                                                │
//! │        ▼  re-read lines                                                 │
//! │  every line received ≥ ordered → LIVREE + delivery date                 │
//! │  something received            → PARTIELLE                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use ndayane_core::numbering::DocumentKind;
use ndayane_core::validation::{
    validate_line_count, validate_price, validate_quantity, validate_received_quantity,
};
use ndayane_core::{
    CoreError, Money, PurchaseOrder, PurchaseOrderLine, PurchaseOrderStatus, StockMovement,
    StockMovementReason, Supplier, Warehouse,
};
use ndayane_db::Database;

const LIST_LIMIT: u32 = 100;

// =============================================================================
// Requests & Responses
// =============================================================================

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct OrderLineInput {
    pub product_id: String,
    pub quantity: i64,
    /// Defaults to the product's purchase price.
    #[serde(default)]
    pub unit_price: Option<Money>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateOrderRequest {
    pub supplier_id: String,
    pub lines: Vec<OrderLineInput>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct ReceiveLine {
    pub line_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct PurchaseOrderDetails {
    pub order: PurchaseOrder,
    pub supplier: Supplier,
    pub lines: Vec<PurchaseOrderLine>,
}

// =============================================================================
// Service
// =============================================================================

#[derive(Debug, Clone)]
pub struct PurchasingService {
    db: Database,
}

impl PurchasingService {
    pub fn new(db: Database) -> Self {
        PurchasingService { db }
    }

    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> ServiceResult<PurchaseOrderDetails> {
        if request.lines.is_empty() {
            return Err(CoreError::EmptyOrder.into());
        }
        validate_line_count(request.lines.len())?;
        for line in &request.lines {
            validate_quantity(line.quantity)?;
            if let Some(price) = line.unit_price {
                validate_price("unit price", price)?;
            }
        }

        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        let supplier = self
            .db
            .suppliers()
            .get_by_id(&mut tx, &request.supplier_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Supplier", &request.supplier_id))?;
        if !supplier.is_active {
            return Err(CoreError::SupplierInactive(supplier.name).into());
        }

        let ids: Vec<String> = request.lines.iter().map(|l| l.product_id.clone()).collect();
        let products: HashMap<String, _> = self
            .db
            .products()
            .get_many(&mut tx, &ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let order_id = Uuid::new_v4().to_string();
        let mut lines = Vec::with_capacity(request.lines.len());
        for input in &request.lines {
            let product = products
                .get(&input.product_id)
                .ok_or_else(|| CoreError::ProductNotFound(input.product_id.clone()))?;
            if !product.is_active {
                return Err(CoreError::ProductInactive(product.name.clone()).into());
            }

            let unit_price = input.unit_price.unwrap_or(product.purchase_price);
            lines.push(PurchaseOrderLine {
                id: Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                product_id: product.id.clone(),
                ordered_quantity: input.quantity,
                received_quantity: 0,
                unit_price,
                line_total: unit_price.multiply_quantity(input.quantity),
            });
        }

        let number = self
            .db
            .sequences()
            .next_number(&mut tx, DocumentKind::PurchaseOrder, now)
            .await?;

        let order = PurchaseOrder {
            id: order_id,
            number,
            supplier_id: supplier.id.clone(),
            status: PurchaseOrderStatus::Pending,
            total: lines.iter().map(|l| l.line_total).sum(),
            notes: request.notes,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        };
        self.db.purchase_orders().insert(&mut tx, &order).await?;
        for line in &lines {
            self.db.purchase_orders().insert_line(&mut tx, line).await?;
        }

        tx.commit().await?;

        info!(
            number = %order.number,
            supplier = %supplier.name,
            total = %order.total,
            lines = lines.len(),
            "Purchase order created"
        );

        Ok(PurchaseOrderDetails {
            order,
            supplier,
            lines,
        })
    }

    /// Receives goods against an order into the principal warehouse.
    pub async fn receive(
        &self,
        order_id: &str,
        entries: &[ReceiveLine],
    ) -> ServiceResult<PurchaseOrderDetails> {
        debug!(order_id = %order_id, entries = entries.len(), "Receiving purchase order");

        for entry in entries {
            validate_received_quantity(entry.quantity)?;
        }

        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        let order = self.require(&mut tx, order_id).await?;
        if !order.status.is_open() {
            return Err(CoreError::InvalidOrderStatus {
                number: order.number,
                current: order.status.to_string(),
                operation: "received".to_string(),
            }
            .into());
        }

        let lines = self.db.purchase_orders().get_lines(&mut tx, &order.id).await?;
        let principal: Option<Warehouse> = if entries.iter().any(|e| e.quantity > 0) {
            Some(self.db.warehouses().resolve(&mut tx, None).await?)
        } else {
            None
        };

        for entry in entries {
            let line = lines
                .iter()
                .find(|l| l.id == entry.line_id)
                .ok_or_else(|| ServiceError::not_found("Purchase order line", &entry.line_id))?;

            self.db
                .purchase_orders()
                .add_received(&mut tx, &order.id, &line.id, entry.quantity)
                .await?;

            if let (true, Some(warehouse)) = (entry.quantity > 0, principal.as_ref()) {
                let quantity = self
                    .db
                    .stock()
                    .add(&mut tx, &line.product_id, &warehouse.id, entry.quantity, now)
                    .await?;
                self.db
                    .stock()
                    .record_movement(
                        &mut tx,
                        &StockMovement {
                            id: Uuid::new_v4().to_string(),
                            product_id: line.product_id.clone(),
                            warehouse_id: warehouse.id.clone(),
                            delta: entry.quantity,
                            reason: StockMovementReason::Receipt,
                            reference: Some(order.number.clone()),
                            created_at: now,
                        },
                    )
                    .await?;

                debug!(product_id = %line.product_id, received = entry.quantity, quantity, "Stock received");
            }
        }

        let lines = self.db.purchase_orders().get_lines(&mut tx, &order.id).await?;
        let status = if lines.iter().all(PurchaseOrderLine::is_fully_received) {
            Some((PurchaseOrderStatus::Delivered, Some(now)))
        } else if lines.iter().any(|l| l.received_quantity > 0) {
            Some((PurchaseOrderStatus::PartiallyReceived, None))
        } else {
            None
        };

        if let Some((status, delivered_at)) = status {
            self.db
                .purchase_orders()
                .update_status(&mut tx, &order.id, status, delivered_at, now)
                .await?;
        }

        let details = self.details(&mut tx, order_id).await?;
        tx.commit().await?;

        info!(
            number = %details.order.number,
            status = %details.order.status,
            "Purchase order received"
        );

        Ok(details)
    }

    /// Cancels an order that is still waiting for goods.
    pub async fn cancel_order(&self, order_id: &str) -> ServiceResult<PurchaseOrderDetails> {
        let mut tx = self.db.pool().begin().await?;

        let order = self.require(&mut tx, order_id).await?;
        if !order.status.is_open() {
            return Err(CoreError::InvalidOrderStatus {
                number: order.number,
                current: order.status.to_string(),
                operation: "cancelled".to_string(),
            }
            .into());
        }

        self.db
            .purchase_orders()
            .update_status(&mut tx, &order.id, PurchaseOrderStatus::Cancelled, None, Utc::now())
            .await?;

        let details = self.details(&mut tx, order_id).await?;
        tx.commit().await?;

        info!(number = %details.order.number, "Purchase order cancelled");
        Ok(details)
    }

    pub async fn get_order(&self, order_id: &str) -> ServiceResult<PurchaseOrderDetails> {
        let mut conn = self.db.pool().acquire().await?;
        self.details(&mut conn, order_id).await
    }

    /// Orders newest first, optionally by status.
    pub async fn list_orders(
        &self,
        status: Option<PurchaseOrderStatus>,
    ) -> ServiceResult<Vec<PurchaseOrder>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(self
            .db
            .purchase_orders()
            .list(&mut conn, status, LIST_LIMIT)
            .await?)
    }

    async fn require(
        &self,
        conn: &mut SqliteConnection,
        order_id: &str,
    ) -> ServiceResult<PurchaseOrder> {
        self.db
            .purchase_orders()
            .get_by_id(conn, order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Purchase order", order_id))
    }

    async fn details(
        &self,
        conn: &mut SqliteConnection,
        order_id: &str,
    ) -> ServiceResult<PurchaseOrderDetails> {
        let order = self.require(conn, order_id).await?;
        let supplier = self
            .db
            .suppliers()
            .get_by_id(conn, &order.supplier_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Supplier", &order.supplier_id))?;
        let lines = self.db.purchase_orders().get_lines(conn, &order.id).await?;

        Ok(PurchaseOrderDetails {
            order,
            supplier,
            lines,
        })
    }
}
