//! # Report Repository
//!
//! Read-only aggregates behind the daily summary and the dashboard.
//!
//! Periods are half-open `[from, to)` in UTC. Dakar is on UTC all year, so a
//! UTC day is the shop's business day.
//!
//! "Revenue" counts sales that left the counter: everything except
//! `EN_ATTENTE` (held) and `ANNULEE` (cancelled).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;
use ts_rs::TS;

use crate::error::DbResult;
use ndayane_core::{Money, PaymentMode, SaleStatus};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, TS)]
#[ts(export)]
pub struct StatusCount {
    pub status: SaleStatus,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, TS)]
#[ts(export)]
pub struct ModeTotal {
    pub mode: PaymentMode,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, TS)]
#[ts(export)]
pub struct TopProduct {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, TS)]
#[ts(export)]
pub struct LowStockItem {
    pub product_id: String,
    pub reference: String,
    pub name: String,
    pub min_stock: i64,
    /// Total across all warehouses.
    pub quantity: i64,
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportRepository;

impl ReportRepository {
    /// Number of sales per status created in the period.
    pub async fn sale_counts_by_status(
        &self,
        conn: &mut SqliteConnection,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<StatusCount>> {
        let rows = sqlx::query_as::<_, StatusCount>(
            r#"
            SELECT status, COUNT(*) AS count
            FROM sales
            WHERE created_at >= ?1 AND created_at < ?2
            GROUP BY status
            ORDER BY status
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows)
    }

    /// Total of sales that left the counter in the period.
    pub async fn revenue(
        &self,
        conn: &mut SqliteConnection,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Money> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total), 0)
            FROM sales
            WHERE created_at >= ?1 AND created_at < ?2
              AND status NOT IN ('EN_ATTENTE', 'ANNULEE')
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&mut *conn)
        .await?;

        Ok(Money::new(total))
    }

    /// Settlements received in the period, per payment mode.
    pub async fn settlements_by_mode(
        &self,
        conn: &mut SqliteConnection,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<ModeTotal>> {
        let rows = sqlx::query_as::<_, ModeTotal>(
            r#"
            SELECT mode, SUM(amount) AS amount
            FROM payments
            WHERE created_at >= ?1 AND created_at < ?2
              AND payment_type = 'REGLEMENT'
            GROUP BY mode
            ORDER BY amount DESC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows)
    }

    /// Deposits (acomptes) taken in the period.
    pub async fn deposits(
        &self,
        conn: &mut SqliteConnection,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Money> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM payments
            WHERE created_at >= ?1 AND created_at < ?2
              AND payment_type = 'ACOMPTE'
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&mut *conn)
        .await?;

        Ok(Money::new(total))
    }

    /// Best sellers by quantity over the period.
    pub async fn top_products(
        &self,
        conn: &mut SqliteConnection,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<TopProduct>> {
        let rows = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT
                l.product_id,
                MAX(l.product_name) AS product_name,
                SUM(l.quantity) AS quantity,
                SUM(l.line_total) AS revenue
            FROM sale_lines l
            JOIN sales s ON s.id = l.sale_id
            WHERE s.created_at >= ?1 AND s.created_at < ?2
              AND s.status NOT IN ('EN_ATTENTE', 'ANNULEE')
            GROUP BY l.product_id
            ORDER BY quantity DESC, revenue DESC
            LIMIT ?3
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows)
    }

    /// Value of positive stock at purchase price.
    pub async fn stock_value(&self, conn: &mut SqliteConnection) -> DbResult<Money> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(s.quantity * p.purchase_price), 0)
            FROM stock_levels s
            JOIN products p ON p.id = s.product_id
            WHERE s.quantity > 0
            "#,
        )
        .fetch_one(&mut *conn)
        .await?;

        Ok(Money::new(total))
    }

    /// Active products whose total stock is below their threshold.
    pub async fn low_stock(&self, conn: &mut SqliteConnection) -> DbResult<Vec<LowStockItem>> {
        let rows = sqlx::query_as::<_, LowStockItem>(
            r#"
            SELECT
                p.id AS product_id,
                p.reference,
                p.name,
                p.min_stock,
                COALESCE(SUM(s.quantity), 0) AS quantity
            FROM products p
            LEFT JOIN stock_levels s ON s.product_id = p.id
            WHERE p.is_active = 1
            GROUP BY p.id
            HAVING COALESCE(SUM(s.quantity), 0) < p.min_stock
            ORDER BY quantity - p.min_stock, p.name
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows)
    }

    /// Sum of positive balances (money owed to the shop).
    pub async fn outstanding_debt(&self, conn: &mut SqliteConnection) -> DbResult<Money> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(balance), 0) FROM clients WHERE balance > 0")
                .fetch_one(&mut *conn)
                .await?;

        Ok(Money::new(total))
    }

    /// Sum of credit held for clients (negative balances, as a positive amount).
    pub async fn credit_held(&self, conn: &mut SqliteConnection) -> DbResult<Money> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(-balance), 0) FROM clients WHERE balance < 0")
                .fetch_one(&mut *conn)
                .await?;

        Ok(Money::new(total))
    }
}
