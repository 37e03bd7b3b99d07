//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Key Operations
//! - CRUD (products are deactivated, never deleted)
//! - Batch lookup by ids for pricing a whole sale in one query
//! - Search by name or reference
//!
//! ## Batch Lookup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sale with 3 lines ──► get_many([p1, p2, p3])                          │
//! │                              │                                          │
//! │                              ▼                                          │
//! │        SELECT ... FROM products WHERE id IN (?, ?, ?)                   │
//! │                              │                                          │
//! │                              ▼                                          │
//! │        PriceBook { p1 → 1 000, p2 → 500, p3 → 4 750 }                  │
//! │                                                                         │
//! │  One round trip whatever the number of lines.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use crate::error::DbResult;
use ndayane_core::{Money, Product};

const PRODUCT_COLUMNS: &str = "id, reference, name, purchase_price, sale_price, unit, \
                               min_stock, is_active, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductRepository;

impl ProductRepository {
    /// Inserts a new product.
    pub async fn insert(&self, conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, reference = %product.reference, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, reference, name, purchase_price, sale_price, unit,
                min_stock, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.reference)
        .bind(&product.name)
        .bind(product.purchase_price)
        .bind(product.sale_price)
        .bind(&product.unit)
        .bind(product.min_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Gets a product by ID.
    pub async fn get_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }

    /// Gets a product by its business reference.
    pub async fn get_by_reference(
        &self,
        conn: &mut SqliteConnection,
        reference: &str,
    ) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE reference = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(reference)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }

    /// Loads every product in `ids` in a single query.
    ///
    /// Unknown ids are simply absent from the result.
    pub async fn get_many(
        &self,
        conn: &mut SqliteConnection,
        ids: &[String],
    ) -> DbResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = ids.len(), "Batch product lookup");

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ("));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        let products = builder
            .build_query_as::<Product>()
            .fetch_all(&mut *conn)
            .await?;

        Ok(products)
    }

    /// Lists active products ordered by name.
    pub async fn list_active(
        &self,
        conn: &mut SqliteConnection,
        limit: u32,
    ) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?1"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?;

        Ok(products)
    }

    /// Searches active products by name or reference (case-insensitive).
    ///
    /// An empty query lists active products.
    pub async fn search(
        &self,
        conn: &mut SqliteConnection,
        query: &str,
        limit: u32,
    ) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list_active(conn, limit).await;
        }

        let pattern = format!("%{}%", query.to_lowercase());
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE is_active = 1
              AND (LOWER(name) LIKE ?1 OR LOWER(reference) LIKE ?1)
            ORDER BY
                CASE WHEN LOWER(reference) = ?2 THEN 0 ELSE 1 END,
                name
            LIMIT ?3
            "#
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&pattern)
            .bind(query.to_lowercase())
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?;

        Ok(products)
    }

    /// Updates purchase and sale prices. Returns false if the product is unknown.
    pub async fn update_prices(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        purchase_price: Money,
        sale_price: Money,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, sale_price = %sale_price, "Updating product prices");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET purchase_price = ?2, sale_price = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(purchase_price)
        .bind(sale_price)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets the active flag. Returns false if the product is unknown.
    pub async fn set_active(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        active: bool,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, active, "Setting product active flag");

        let result = sqlx::query("UPDATE products SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(now)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
