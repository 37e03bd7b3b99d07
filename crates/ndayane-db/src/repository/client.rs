//! # Client Repository
//!
//! Client accounts and their cached balance.
//!
//! ## Balance Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_balance_delta()  UPDATE clients SET balance = balance + Δ       │
//! │                                                                         │
//! │  spend_credit()         UPDATE clients SET balance = balance + amount  │
//! │                         WHERE id = ? AND -balance >= amount            │
//! │                         no row updated → not enough credit             │
//! │                                                                         │
//! │  set_balance()          reconciliation only                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqliteConnection;
use tracing::debug;
use ts_rs::TS;

use crate::error::DbResult;
use ndayane_core::{Client, Money};

const CLIENT_COLUMNS: &str = "id, name, phone, email, address, opening_balance, balance, \
                              created_at, updated_at";

/// Contact fields that can be edited after creation.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct ClientContact {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClientRepository;

impl ClientRepository {
    pub async fn insert(&self, conn: &mut SqliteConnection, client: &Client) -> DbResult<()> {
        debug!(id = %client.id, name = %client.name, "Inserting client");

        sqlx::query(
            r#"
            INSERT INTO clients (
                id, name, phone, email, address,
                opening_balance, balance, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(&client.phone)
        .bind(&client.email)
        .bind(&client.address)
        .bind(client.opening_balance)
        .bind(client.balance)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(client)
    }

    /// Lists clients by name, optionally filtered on name or phone.
    pub async fn list(
        &self,
        conn: &mut SqliteConnection,
        query: &str,
        limit: u32,
    ) -> DbResult<Vec<Client>> {
        let pattern = format!("%{}%", query.trim().to_lowercase());
        let sql = format!(
            r#"
            SELECT {CLIENT_COLUMNS} FROM clients
            WHERE LOWER(name) LIKE ?1 OR COALESCE(phone, '') LIKE ?1
            ORDER BY name
            LIMIT ?2
            "#
        );
        let clients = sqlx::query_as::<_, Client>(&sql)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?;

        Ok(clients)
    }

    /// Clients that owe money (balance > 0), largest debt first.
    pub async fn debtors(&self, conn: &mut SqliteConnection) -> DbResult<Vec<Client>> {
        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE balance > 0 ORDER BY balance DESC, name"
        );
        let clients = sqlx::query_as::<_, Client>(&sql)
            .fetch_all(&mut *conn)
            .await?;

        Ok(clients)
    }

    /// Every client id, for bulk reconciliation.
    pub async fn list_ids(&self, conn: &mut SqliteConnection) -> DbResult<Vec<String>> {
        let ids = sqlx::query_scalar("SELECT id FROM clients ORDER BY created_at, rowid")
            .fetch_all(&mut *conn)
            .await?;

        Ok(ids)
    }

    pub async fn update_contact(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        contact: &ClientContact,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, "Updating client contact");

        let result = sqlx::query(
            r#"
            UPDATE clients
            SET name = ?2, phone = ?3, email = ?4, address = ?5, updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&contact.name)
        .bind(&contact.phone)
        .bind(&contact.email)
        .bind(&contact.address)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Adds a signed delta to the balance. Returns the new balance, `None`
    /// when the client is unknown.
    pub async fn apply_balance_delta(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        delta: Money,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Money>> {
        debug!(id = %id, delta = %delta, "Applying balance delta");

        let balance: Option<Money> = sqlx::query_scalar(
            r#"
            UPDATE clients
            SET balance = balance + ?2, updated_at = ?3
            WHERE id = ?1
            RETURNING balance
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(balance)
    }

    /// Spends `amount` of held credit in one guarded statement.
    ///
    /// Returns the new balance, or `None` when the client does not hold
    /// at least `amount` of credit (or does not exist).
    pub async fn spend_credit(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        amount: Money,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Money>> {
        debug!(id = %id, amount = %amount, "Spending client credit");

        let balance: Option<Money> = sqlx::query_scalar(
            r#"
            UPDATE clients
            SET balance = balance + ?2, updated_at = ?3
            WHERE id = ?1 AND -balance >= ?2
            RETURNING balance
            "#,
        )
        .bind(id)
        .bind(amount)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(balance)
    }

    /// Overwrites the cached balance (reconciliation).
    pub async fn set_balance(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        balance: Money,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query("UPDATE clients SET balance = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(balance)
            .bind(now)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use uuid::Uuid;

    fn client(name: &str, balance: i64) -> Client {
        let now = Utc::now();
        Client {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            phone: Some("+221 77 000 00 00".to_string()),
            email: None,
            address: Some("Thiès".to_string()),
            opening_balance: Money::new(balance),
            balance: Money::new(balance),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_balance_delta() {
        let db = test_support::db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let repo = db.clients();

        let c = client("Moussa Ndiaye", 0);
        repo.insert(&mut conn, &c).await.unwrap();

        let after = repo
            .apply_balance_delta(&mut conn, &c.id, Money::new(-2000), Utc::now())
            .await
            .unwrap();
        assert_eq!(after, Some(Money::new(-2000)));

        let missing = repo
            .apply_balance_delta(&mut conn, "nope", Money::new(1), Utc::now())
            .await
            .unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_spend_credit_is_guarded() {
        let db = test_support::db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let repo = db.clients();

        let c = client("Moussa Ndiaye", -2000);
        repo.insert(&mut conn, &c).await.unwrap();

        let refused = repo
            .spend_credit(&mut conn, &c.id, Money::new(2500), Utc::now())
            .await
            .unwrap();
        assert_eq!(refused, None);

        let ok = repo
            .spend_credit(&mut conn, &c.id, Money::new(1500), Utc::now())
            .await
            .unwrap();
        assert_eq!(ok, Some(Money::new(-500)));
    }

    #[tokio::test]
    async fn test_debtors_and_listing() {
        let db = test_support::db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let repo = db.clients();

        repo.insert(&mut conn, &client("Awa", 5000)).await.unwrap();
        repo.insert(&mut conn, &client("Binta", -1000)).await.unwrap();
        repo.insert(&mut conn, &client("Cheikh", 12000)).await.unwrap();

        let debtors = repo.debtors(&mut conn).await.unwrap();
        let names: Vec<_> = debtors.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Cheikh", "Awa"]);

        assert_eq!(repo.list(&mut conn, "", 50).await.unwrap().len(), 3);
        assert_eq!(repo.list(&mut conn, "bin", 50).await.unwrap().len(), 1);
        assert_eq!(repo.list_ids(&mut conn).await.unwrap().len(), 3);
    }
}
