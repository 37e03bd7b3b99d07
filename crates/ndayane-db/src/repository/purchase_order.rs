//! # Purchase Order Repository
//!
//! Supplier orders (bons de commande) and their lines.
//!
//! ## Receiving
//! ```text
//! EN_ATTENTE ──receive some──► PARTIELLE ──receive rest──► LIVREE (delivered_at)
//!     │                            │
//!     └────────── cancel ──────────┴──► ANNULEE
//! ```
//! Received quantities accumulate with `received_quantity = received_quantity + n`.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use ndayane_core::{PurchaseOrder, PurchaseOrderLine, PurchaseOrderStatus};

const ORDER_COLUMNS: &str = "id, number, supplier_id, status, total, notes, delivered_at, \
                             created_at, updated_at";

const LINE_COLUMNS: &str = "id, order_id, product_id, ordered_quantity, received_quantity, \
                            unit_price, line_total";

#[derive(Debug, Clone, Copy, Default)]
pub struct PurchaseOrderRepository;

impl PurchaseOrderRepository {
    pub async fn insert(&self, conn: &mut SqliteConnection, order: &PurchaseOrder) -> DbResult<()> {
        debug!(id = %order.id, number = %order.number, "Inserting purchase order");

        sqlx::query(
            r#"
            INSERT INTO purchase_orders (
                id, number, supplier_id, status, total, notes,
                delivered_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&order.id)
        .bind(&order.number)
        .bind(&order.supplier_id)
        .bind(order.status)
        .bind(order.total)
        .bind(&order.notes)
        .bind(order.delivered_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn insert_line(
        &self,
        conn: &mut SqliteConnection,
        line: &PurchaseOrderLine,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO purchase_order_lines (
                id, order_id, product_id, ordered_quantity, received_quantity,
                unit_price, line_total
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&line.id)
        .bind(&line.order_id)
        .bind(&line.product_id)
        .bind(line.ordered_quantity)
        .bind(line.received_quantity)
        .bind(line.unit_price)
        .bind(line.line_total)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<PurchaseOrder>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE id = ?1");
        let order = sqlx::query_as::<_, PurchaseOrder>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(order)
    }

    pub async fn get_lines(
        &self,
        conn: &mut SqliteConnection,
        order_id: &str,
    ) -> DbResult<Vec<PurchaseOrderLine>> {
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM purchase_order_lines WHERE order_id = ?1 ORDER BY rowid"
        );
        let lines = sqlx::query_as::<_, PurchaseOrderLine>(&sql)
            .bind(order_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(lines)
    }

    /// Orders newest first, optionally by status.
    pub async fn list(
        &self,
        conn: &mut SqliteConnection,
        status: Option<PurchaseOrderStatus>,
        limit: u32,
    ) -> DbResult<Vec<PurchaseOrder>> {
        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM purchase_orders
            WHERE ?1 IS NULL OR status = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#
        );
        let orders = sqlx::query_as::<_, PurchaseOrder>(&sql)
            .bind(status)
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?;

        Ok(orders)
    }

    /// Adds `quantity` to a line's received quantity. Returns false if the
    /// line does not belong to the order.
    pub async fn add_received(
        &self,
        conn: &mut SqliteConnection,
        order_id: &str,
        line_id: &str,
        quantity: i64,
    ) -> DbResult<bool> {
        debug!(order_id = %order_id, line_id = %line_id, quantity, "Receiving order line");

        let result = sqlx::query(
            r#"
            UPDATE purchase_order_lines
            SET received_quantity = received_quantity + ?3
            WHERE id = ?2 AND order_id = ?1
            "#,
        )
        .bind(order_id)
        .bind(line_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_status(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        status: PurchaseOrderStatus,
        delivered_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, status = %status, "Updating purchase order status");

        let result = sqlx::query(
            r#"
            UPDATE purchase_orders
            SET status = ?2, delivered_at = COALESCE(?3, delivered_at), updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(delivered_at)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Orders still waiting for goods.
    pub async fn count_open(&self, conn: &mut SqliteConnection) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM purchase_orders WHERE status IN ('EN_ATTENTE', 'PARTIELLE')",
        )
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }
}
