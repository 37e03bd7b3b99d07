//! # Payment Repository
//!
//! The payment ledger. Rows are append-only: no update, no delete.
//!
//! Each row carries the `balance_effect` it applied to its client, which is
//! what [`PaymentRepository::balance_effects_for_client`] sums when a cached
//! balance is reconciled.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use ndayane_core::{Money, Payment};

const PAYMENT_COLUMNS: &str = "id, sale_id, client_id, amount, mode, payment_type, reference, \
                               notes, balance_effect, created_at";

#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentRepository;

impl PaymentRepository {
    /// Appends a payment.
    pub async fn insert(&self, conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
        debug!(
            id = %payment.id,
            amount = %payment.amount,
            mode = %payment.mode,
            payment_type = %payment.payment_type,
            "Recording payment"
        );

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, sale_id, client_id, amount, mode, payment_type,
                reference, notes, balance_effect, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.sale_id)
        .bind(&payment.client_id)
        .bind(payment.amount)
        .bind(payment.mode)
        .bind(payment.payment_type)
        .bind(&payment.reference)
        .bind(&payment.notes)
        .bind(payment.balance_effect)
        .bind(payment.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1");
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(payment)
    }

    /// Payments tied to a sale, oldest first.
    pub async fn list_for_sale(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
    ) -> DbResult<Vec<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE sale_id = ?1 ORDER BY created_at, rowid"
        );
        let payments = sqlx::query_as::<_, Payment>(&sql)
            .bind(sale_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(payments)
    }

    /// Payments of a client, newest first.
    pub async fn list_for_client(
        &self,
        conn: &mut SqliteConnection,
        client_id: &str,
        limit: u32,
    ) -> DbResult<Vec<Payment>> {
        let sql = format!(
            r#"
            SELECT {PAYMENT_COLUMNS} FROM payments
            WHERE client_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#
        );
        let payments = sqlx::query_as::<_, Payment>(&sql)
            .bind(client_id)
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?;

        Ok(payments)
    }

    /// Sum of every payment tied to a sale.
    pub async fn total_for_sale(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
    ) -> DbResult<Money> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0) FROM payments WHERE sale_id = ?1")
                .bind(sale_id)
                .fetch_one(&mut *conn)
                .await?;

        Ok(Money::new(total))
    }

    /// Sum of the balance effects recorded for a client.
    pub async fn balance_effects_for_client(
        &self,
        conn: &mut SqliteConnection,
        client_id: &str,
    ) -> DbResult<Money> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(balance_effect), 0) FROM payments WHERE client_id = ?1",
        )
        .bind(client_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(Money::new(total))
    }

    pub async fn count_for_sale(&self, conn: &mut SqliteConnection, sale_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE sale_id = ?1")
            .bind(sale_id)
            .fetch_one(&mut *conn)
            .await?;

        Ok(count)
    }
}
