//! # Supplier Repository

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use ndayane_core::Supplier;

const SUPPLIER_COLUMNS: &str = "id, name, phone, email, address, is_active, created_at";

#[derive(Debug, Clone, Copy, Default)]
pub struct SupplierRepository;

impl SupplierRepository {
    pub async fn insert(&self, conn: &mut SqliteConnection, supplier: &Supplier) -> DbResult<()> {
        debug!(id = %supplier.id, name = %supplier.name, "Inserting supplier");

        sqlx::query(
            r#"
            INSERT INTO suppliers (id, name, phone, email, address, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.phone)
        .bind(&supplier.email)
        .bind(&supplier.address)
        .bind(supplier.is_active)
        .bind(supplier.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Supplier>> {
        let sql = format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = ?1");
        let supplier = sqlx::query_as::<_, Supplier>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(supplier)
    }

    pub async fn list(
        &self,
        conn: &mut SqliteConnection,
        include_inactive: bool,
    ) -> DbResult<Vec<Supplier>> {
        let sql = format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE is_active = 1 OR ?1 ORDER BY name"
        );
        let suppliers = sqlx::query_as::<_, Supplier>(&sql)
            .bind(include_inactive)
            .fetch_all(&mut *conn)
            .await?;

        Ok(suppliers)
    }

    pub async fn set_active(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        active: bool,
    ) -> DbResult<bool> {
        debug!(id = %id, active, "Setting supplier active flag");

        let result = sqlx::query("UPDATE suppliers SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
