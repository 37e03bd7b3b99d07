//! # Warehouse Repository
//!
//! Dépôts and the principal flag. A unique partial index guarantees at most
//! one principal warehouse.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use ndayane_core::Warehouse;

#[derive(Debug, Clone, Copy, Default)]
pub struct WarehouseRepository;

impl WarehouseRepository {
    pub async fn insert(&self, conn: &mut SqliteConnection, warehouse: &Warehouse) -> DbResult<()> {
        debug!(id = %warehouse.id, name = %warehouse.name, "Inserting warehouse");

        sqlx::query(
            r#"
            INSERT INTO warehouses (id, name, location, is_principal, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&warehouse.id)
        .bind(&warehouse.name)
        .bind(&warehouse.location)
        .bind(warehouse.is_principal)
        .bind(warehouse.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Warehouse>> {
        let warehouse = sqlx::query_as::<_, Warehouse>(
            "SELECT id, name, location, is_principal, created_at FROM warehouses WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(warehouse)
    }

    /// The principal warehouse, if one is flagged.
    pub async fn get_principal(&self, conn: &mut SqliteConnection) -> DbResult<Option<Warehouse>> {
        let warehouse = sqlx::query_as::<_, Warehouse>(
            r#"
            SELECT id, name, location, is_principal, created_at
            FROM warehouses
            WHERE is_principal = 1
            LIMIT 1
            "#,
        )
        .fetch_optional(&mut *conn)
        .await?;

        Ok(warehouse)
    }

    /// Resolves the warehouse stock moves through.
    ///
    /// ```text
    /// requested id given? ── yes ──► that warehouse (must exist)
    ///        │
    ///        no
    ///        ▼
    /// principal warehouse (must be configured)
    /// ```
    pub async fn resolve(
        &self,
        conn: &mut SqliteConnection,
        requested: Option<&str>,
    ) -> DbResult<Warehouse> {
        match requested {
            Some(id) => self
                .get_by_id(conn, id)
                .await?
                .ok_or_else(|| DbError::not_found("Warehouse", id)),
            None => self
                .get_principal(conn)
                .await?
                .ok_or_else(|| DbError::not_found("Warehouse", "principal")),
        }
    }

    pub async fn list(&self, conn: &mut SqliteConnection) -> DbResult<Vec<Warehouse>> {
        let warehouses = sqlx::query_as::<_, Warehouse>(
            r#"
            SELECT id, name, location, is_principal, created_at
            FROM warehouses
            ORDER BY is_principal DESC, name
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(warehouses)
    }

    /// Makes `id` the only principal warehouse. Returns false if unknown.
    ///
    /// The old flag is cleared first so the unique index never sees two.
    pub async fn set_principal(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Setting principal warehouse");

        if self.get_by_id(conn, id).await?.is_none() {
            return Ok(false);
        }

        sqlx::query("UPDATE warehouses SET is_principal = 0 WHERE is_principal = 1 AND id <> ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        sqlx::query("UPDATE warehouses SET is_principal = 1 WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(true)
    }
}
