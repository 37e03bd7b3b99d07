//! # Stock Repository
//!
//! Stock levels per (product, warehouse) and the movement journal.
//!
//! ## Update Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  decrement_existing()   UPDATE ... SET quantity = quantity - n          │
//! │                         only touches an existing row, returns None      │
//! │                         when the pair has never been stocked            │
//! │                                                                         │
//! │  add()                  INSERT ... ON CONFLICT DO UPDATE                │
//! │                         SET quantity = quantity + n                     │
//! │                         creates the row on first receipt                │
//! │                                                                         │
//! │  Both are single statements: no read-modify-write.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::debug;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::DbResult;
use ndayane_core::{StockLevel, StockMovement};

/// Stock of one product in one warehouse, with the warehouse name.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, TS)]
#[ts(export)]
pub struct WarehouseStock {
    pub warehouse_id: String,
    pub warehouse_name: String,
    pub is_principal: bool,
    pub quantity: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StockRepository;

impl StockRepository {
    pub async fn get_level(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        warehouse_id: &str,
    ) -> DbResult<Option<StockLevel>> {
        let level = sqlx::query_as::<_, StockLevel>(
            r#"
            SELECT id, product_id, warehouse_id, quantity, updated_at
            FROM stock_levels
            WHERE product_id = ?1 AND warehouse_id = ?2
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(level)
    }

    /// Stock of a product in every warehouse that has a row for it.
    pub async fn levels_for_product(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
    ) -> DbResult<Vec<WarehouseStock>> {
        let levels = sqlx::query_as::<_, WarehouseStock>(
            r#"
            SELECT
                w.id AS warehouse_id,
                w.name AS warehouse_name,
                w.is_principal,
                s.quantity
            FROM stock_levels s
            JOIN warehouses w ON w.id = s.warehouse_id
            WHERE s.product_id = ?1
            ORDER BY w.is_principal DESC, w.name
            "#,
        )
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(levels)
    }

    /// Total quantity of a product across warehouses.
    pub async fn total_for_product(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
    ) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM stock_levels WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(total)
    }

    /// Removes `quantity` from an existing row.
    ///
    /// ## Returns
    /// - `Some(new_quantity)`: the row existed (new quantity may be negative)
    /// - `None`: the product was never stocked in that warehouse
    pub async fn decrement_existing(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        warehouse_id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<Option<i64>> {
        debug!(product_id = %product_id, warehouse_id = %warehouse_id, quantity, "Decrementing stock");

        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE stock_levels
            SET quantity = quantity - ?3, updated_at = ?4
            WHERE product_id = ?1 AND warehouse_id = ?2
            RETURNING quantity
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .bind(quantity)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(remaining)
    }

    /// Adds a signed `delta`, creating the row when absent. Returns the new quantity.
    pub async fn add(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        warehouse_id: &str,
        delta: i64,
        now: DateTime<Utc>,
    ) -> DbResult<i64> {
        debug!(product_id = %product_id, warehouse_id = %warehouse_id, delta, "Adding stock");

        let quantity: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO stock_levels (id, product_id, warehouse_id, quantity, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (product_id, warehouse_id)
            DO UPDATE SET quantity = quantity + excluded.quantity,
                          updated_at = excluded.updated_at
            RETURNING quantity
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(product_id)
        .bind(warehouse_id)
        .bind(delta)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(quantity)
    }

    /// Appends a row to the movement journal.
    pub async fn record_movement(
        &self,
        conn: &mut SqliteConnection,
        movement: &StockMovement,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, product_id, warehouse_id, delta, reason, reference, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.product_id)
        .bind(&movement.warehouse_id)
        .bind(movement.delta)
        .bind(movement.reason)
        .bind(&movement.reference)
        .bind(movement.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Latest movements of a product, newest first.
    pub async fn movements_for_product(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        limit: u32,
    ) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, product_id, warehouse_id, delta, reason, reference, created_at
            FROM stock_movements
            WHERE product_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

        Ok(movements)
    }
}
