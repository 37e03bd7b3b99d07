//! # Invoice Service
//!
//! Builds the invoice (facture) document for a sale. Rendering to PDF or
//! paper happens in the client; this service assembles the data.
//!
//! ## Numbering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sale already has an invoice number? ── yes ──► reuse it               │
//! │        │                                                                │
//! │        no                                                               │
//! │        ▼                                                                │
//! │  next FA<yyyymm><seq>  → set_invoice_number (only if still NULL)        │
//! │        │                                                                │
//! │        └── lost the race? re-read the stored number                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Printing the same sale twice yields the same invoice number.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use ts_rs::TS;

use crate::config::StoreConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::sales::load_details;
use ndayane_core::numbering::DocumentKind;
use ndayane_core::{Client, CoreError, Money, SaleLine, SaleStatus};
use ndayane_db::Database;

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct InvoiceDocument {
    pub invoice_number: String,
    pub sale_number: String,
    #[ts(as = "String")]
    pub issued_at: DateTime<Utc>,
    pub store: StoreConfig,
    pub client: Option<Client>,
    pub lines: Vec<SaleLine>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub amount_paid: Money,
    pub balance_due: Money,
    pub status: SaleStatus,
}

#[derive(Debug, Clone)]
pub struct InvoiceService {
    db: Database,
    store: StoreConfig,
}

impl InvoiceService {
    pub fn new(db: Database, store: StoreConfig) -> Self {
        InvoiceService { db, store }
    }

    /// Invoice for a sale, allocating its number on first request.
    ///
    /// `issued_at` is the validation time, or the creation time for a held sale.
    pub async fn for_sale(&self, sale_id: &str) -> ServiceResult<InvoiceDocument> {
        let mut tx = self.db.pool().begin().await?;

        let sale = self
            .db
            .sales()
            .get_by_id(&mut tx, sale_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Sale", sale_id))?;

        if sale.status == SaleStatus::Cancelled {
            return Err(CoreError::InvalidSaleStatus {
                number: sale.number.clone(),
                current: sale.status.to_string(),
                operation: "invoiced".to_string(),
            }
            .into());
        }

        let invoice_number = match self.db.sales().get_invoice_number(&mut tx, sale_id).await? {
            Some(number) => number,
            None => {
                let number = self
                    .db
                    .sequences()
                    .next_number(&mut tx, DocumentKind::Invoice, Utc::now())
                    .await?;
                if self
                    .db
                    .sales()
                    .set_invoice_number(&mut tx, sale_id, &number)
                    .await?
                {
                    info!(sale = %sale.number, invoice = %number, "Invoice number issued");
                    number
                } else {
                    self.db
                        .sales()
                        .get_invoice_number(&mut tx, sale_id)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Invoice", sale_id))?
                }
            }
        };

        let details = load_details(&self.db, &mut tx, sale).await?;
        tx.commit().await?;

        Ok(InvoiceDocument {
            invoice_number,
            sale_number: details.sale.number,
            issued_at: details.sale.validated_at.unwrap_or(details.sale.created_at),
            store: self.store.clone(),
            client: details.client,
            lines: details.lines,
            subtotal: details.sale.subtotal,
            discount: details.sale.discount,
            total: details.sale.total,
            amount_paid: details.amount_paid,
            balance_due: details.amount_due,
            status: details.sale.status,
        })
    }
}
