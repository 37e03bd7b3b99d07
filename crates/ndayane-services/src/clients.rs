//! # Client Service
//!
//! Customer accounts. The balance is moved only by the payment ledger; this
//! service opens accounts and edits contact details.

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use ndayane_core::validation::{validate_email, validate_name, validate_phone};
use ndayane_core::{Client, Money};
use ndayane_db::repository::client::ClientContact;
use ndayane_db::Database;

const DEFAULT_LIMIT: u32 = 50;

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct CreateClientRequest {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Debt (positive) or credit (negative) carried over from paper books.
    #[serde(default)]
    pub opening_balance: Money,
}

#[derive(Debug, Clone)]
pub struct ClientService {
    db: Database,
}

impl ClientService {
    pub fn new(db: Database) -> Self {
        ClientService { db }
    }

    pub async fn create(&self, request: CreateClientRequest) -> ServiceResult<Client> {
        let contact = normalize(ClientContact {
            name: request.name,
            phone: request.phone,
            email: request.email,
            address: request.address,
        });
        check_contact(&contact)?;

        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4().to_string(),
            name: contact.name,
            phone: contact.phone,
            email: contact.email,
            address: contact.address,
            opening_balance: request.opening_balance,
            balance: request.opening_balance,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.db.pool().acquire().await?;
        self.db.clients().insert(&mut conn, &client).await?;

        info!(name = %client.name, opening_balance = %client.opening_balance, "Client created");
        Ok(client)
    }

    pub async fn get(&self, client_id: &str) -> ServiceResult<Client> {
        let mut conn = self.db.pool().acquire().await?;
        self.db
            .clients()
            .get_by_id(&mut conn, client_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Client", client_id))
    }

    /// Clients by name; `query` filters on name or phone.
    pub async fn list(&self, query: Option<&str>, limit: Option<u32>) -> ServiceResult<Vec<Client>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(self
            .db
            .clients()
            .list(&mut conn, query.unwrap_or(""), limit.unwrap_or(DEFAULT_LIMIT))
            .await?)
    }

    pub async fn update_contact(
        &self,
        client_id: &str,
        contact: ClientContact,
    ) -> ServiceResult<Client> {
        let contact = normalize(contact);
        check_contact(&contact)?;

        let mut conn = self.db.pool().acquire().await?;
        let updated = self
            .db
            .clients()
            .update_contact(&mut conn, client_id, &contact, Utc::now())
            .await?;
        drop(conn);

        if !updated {
            return Err(ServiceError::not_found("Client", client_id));
        }

        info!(client_id = %client_id, "Client contact updated");
        self.get(client_id).await
    }

    /// Clients who owe money, largest debt first.
    pub async fn debtors(&self) -> ServiceResult<Vec<Client>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(self.db.clients().debtors(&mut conn).await?)
    }
}

fn normalize(contact: ClientContact) -> ClientContact {
    let clean = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    ClientContact {
        name: contact.name.trim().to_string(),
        phone: clean(contact.phone),
        email: clean(contact.email),
        address: clean(contact.address),
    }
}

fn check_contact(contact: &ClientContact) -> ServiceResult<()> {
    validate_name("client name", &contact.name)?;
    validate_phone(contact.phone.as_deref())?;
    validate_email(contact.email.as_deref())?;
    Ok(())
}
