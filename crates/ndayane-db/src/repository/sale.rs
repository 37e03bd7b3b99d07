//! # Sale Repository
//!
//! Database operations for sales and sale lines.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── insert() + insert_line() × n                                   │
//! │         status EN_ATTENTE (held) or VALIDEE (paid at the counter)      │
//! │                                                                         │
//! │  2. VALIDATE (held sales)                                              │
//! │     └── mark_validated() → VALIDEE, warehouse, validated_at            │
//! │                                                                         │
//! │  3. PAYMENTS                                                           │
//! │     └── update_status() → PARTIELLE / PAYEE                            │
//! │                                                                         │
//! │  4. (OPTIONAL) CANCEL                                                  │
//! │     └── update_status() → ANNULEE                                      │
//! │                                                                         │
//! │  Sales are never deleted. Lines are immutable.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;
use ts_rs::TS;

use crate::error::DbResult;
use ndayane_core::{Sale, SaleLine, SaleStatus};

const SALE_COLUMNS: &str = "id, number, client_id, user_id, subtotal, discount, total, status, \
                            payment_mode, warehouse_id, notes, created_at, updated_at, validated_at";

const LINE_COLUMNS: &str = "id, sale_id, product_id, product_name, quantity, unit_price, \
                            discount, line_total, created_at";

/// Filter for listing sales. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct SaleFilter {
    pub status: Option<SaleStatus>,
    pub client_id: Option<String>,
    /// Inclusive lower bound on `created_at`.
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

/// Repository for sale database operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaleRepository;

impl SaleRepository {
    /// Inserts a sale header.
    pub async fn insert(&self, conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, number = %sale.number, status = %sale.status, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, number, client_id, user_id,
                subtotal, discount, total, status, payment_mode, warehouse_id,
                notes, created_at, updated_at, validated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14
            )
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.number)
        .bind(&sale.client_id)
        .bind(&sale.user_id)
        .bind(sale.subtotal)
        .bind(sale.discount)
        .bind(sale.total)
        .bind(sale.status)
        .bind(sale.payment_mode)
        .bind(&sale.warehouse_id)
        .bind(&sale.notes)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(sale.validated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts a sale line.
    ///
    /// ## Snapshot Pattern
    /// Product name and unit price are copied onto the line so history does
    /// not change when the catalog does.
    pub async fn insert_line(&self, conn: &mut SqliteConnection, line: &SaleLine) -> DbResult<()> {
        debug!(sale_id = %line.sale_id, product_id = %line.product_id, "Inserting sale line");

        sqlx::query(
            r#"
            INSERT INTO sale_lines (
                id, sale_id, product_id, product_name,
                quantity, unit_price, discount, line_total, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&line.id)
        .bind(&line.sale_id)
        .bind(&line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.discount)
        .bind(line.line_total)
        .bind(line.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(sale)
    }

    /// Gets a sale by its number (`VT2026100001`).
    pub async fn get_by_number(
        &self,
        conn: &mut SqliteConnection,
        number: &str,
    ) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE number = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(number)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(sale)
    }

    /// Lines of a sale in the order they were rung.
    pub async fn get_lines(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
    ) -> DbResult<Vec<SaleLine>> {
        let sql = format!("SELECT {LINE_COLUMNS} FROM sale_lines WHERE sale_id = ?1 ORDER BY rowid");
        let lines = sqlx::query_as::<_, SaleLine>(&sql)
            .bind(sale_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(lines)
    }

    /// Lists sales matching the filter, newest first.
    pub async fn list(&self, conn: &mut SqliteConnection, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        debug!(?filter, "Listing sales");

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {SALE_COLUMNS} FROM sales WHERE 1 = 1"));

        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(client_id) = &filter.client_id {
            builder.push(" AND client_id = ").push_bind(client_id.as_str());
        }
        if let Some(from) = filter.from {
            builder.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            builder.push(" AND created_at < ").push_bind(to);
        }

        builder
            .push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(filter.limit.unwrap_or(100));

        let sales = builder.build_query_as::<Sale>().fetch_all(&mut *conn).await?;
        Ok(sales)
    }

    /// Sets the status. Returns false if the sale is unknown.
    pub async fn update_status(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        status: SaleStatus,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, status = %status, "Updating sale status");

        let result = sqlx::query("UPDATE sales SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(now)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks a held sale as validated from `warehouse_id`.
    pub async fn mark_validated(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        warehouse_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, warehouse_id = %warehouse_id, "Marking sale validated");

        let result = sqlx::query(
            r#"
            UPDATE sales
            SET status = ?2, warehouse_id = ?3, validated_at = ?4, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(SaleStatus::Validated)
        .bind(warehouse_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Invoice number already issued for a sale, if any.
    pub async fn get_invoice_number(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<String>> {
        let number: Option<Option<String>> =
            sqlx::query_scalar("SELECT invoice_number FROM sales WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(number.flatten())
    }

    /// Stores the invoice number. Only the first number sticks.
    pub async fn set_invoice_number(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        invoice_number: &str,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE sales SET invoice_number = ?2 WHERE id = ?1 AND invoice_number IS NULL",
        )
        .bind(id)
        .bind(invoice_number)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
