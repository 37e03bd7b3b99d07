//! # Payments Service
//!
//! The payment ledger and the client credit account.
//!
//! ## Balance Sign
//! ```text
//!   balance > 0   client owes the shop (dette)
//!   balance < 0   shop holds money for the client (avoir / acompte)
//! ```
//!
//! ## Operations and their balance effect
//! ```text
//! ┌──────────────────────┬──────────────────┬──────────────────────────────┐
//! │ operation            │ payment row      │ client balance               │
//! ├──────────────────────┼──────────────────┼──────────────────────────────┤
//! │ record (sale)        │ mode, REGLEMENT  │ unchanged, sale status       │
//! │                      │                  │ recomputed                   │
//! │ record (client only) │ mode, REGLEMENT  │ − amount (debt settled)      │
//! │ record_deposit       │ mode, ACOMPTE    │ − amount (credit grows)      │
//! │ use_credit           │ CREDIT/REGLEMENT │ + amount (credit spent),     │
//! │                      │                  │ sale status recomputed       │
//! └──────────────────────┴──────────────────┴──────────────────────────────┘
//! ```
//!
//! Every row stores the `balance_effect` it applied, so the cached balance
//! can always be rebuilt as `opening_balance + Σ balance_effect`
//! ([`PaymentsService::reconcile_balance`]).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use ndayane_core::ledger::{self, BalanceDrift};
use ndayane_core::validation::validate_payment_amount;
use ndayane_core::{
    Client, CoreError, Money, Payment, PaymentMode, PaymentType, Sale, SaleStatus,
};
use ndayane_db::{Database, DbError};

/// Default page size for a client's payment history.
const HISTORY_LIMIT: u32 = 200;

// =============================================================================
// Requests & Responses
// =============================================================================

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct RecordPaymentRequest {
    #[serde(default)]
    pub sale_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    pub amount: Money,
    pub mode: PaymentMode,
    #[serde(default)]
    pub payment_type: Option<PaymentType>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct DepositRequest {
    /// Required; kept optional so a missing client is a business error
    /// rather than a parse failure.
    #[serde(default)]
    pub client_id: Option<String>,
    pub amount: Money,
    pub mode: PaymentMode,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// What a payment changed.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct PaymentOutcome {
    pub payment: Payment,
    /// Sale status after the payment, when tied to a sale.
    pub sale_status: Option<SaleStatus>,
    /// Client balance after the payment, when tied to a client.
    pub client_balance: Option<Money>,
}

// =============================================================================
// Service
// =============================================================================

#[derive(Debug, Clone)]
pub struct PaymentsService {
    db: Database,
}

impl PaymentsService {
    pub fn new(db: Database) -> Self {
        PaymentsService { db }
    }

    /// Records a payment against a sale, a client account, or both.
    pub async fn record(&self, request: RecordPaymentRequest) -> ServiceResult<PaymentOutcome> {
        debug!(
            sale_id = ?request.sale_id,
            client_id = ?request.client_id,
            amount = %request.amount,
            mode = %request.mode,
            "Recording payment"
        );

        validate_payment_amount(request.amount)?;
        let payment_type = request.payment_type.unwrap_or_default();

        let mut tx = self.db.pool().begin().await?;

        let sale = match request.sale_id.as_deref() {
            Some(id) => Some(self.require_sale(&mut tx, id).await?),
            None => None,
        };
        let client = match request.client_id.as_deref() {
            Some(id) => Some(self.require_client(&mut tx, id).await?),
            None => None,
        };

        let effect = ledger::payment_effect(
            payment_type,
            sale.is_some(),
            client.is_some(),
            request.amount,
        );

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            sale_id: request.sale_id.clone(),
            client_id: request.client_id.clone(),
            amount: request.amount,
            mode: request.mode,
            payment_type,
            reference: request.reference,
            notes: request.notes,
            balance_effect: effect,
            created_at: Utc::now(),
        };
        self.db.payments().insert(&mut tx, &payment).await?;

        let client_balance = match &client {
            Some(client) if !effect.is_zero() => {
                Some(self.apply_effect(&mut tx, &client.id, effect).await?)
            }
            Some(client) => Some(client.balance),
            None => None,
        };

        let sale_status = match &sale {
            Some(sale) => Some(self.refresh_in(&mut tx, sale).await?),
            None => None,
        };

        tx.commit().await?;

        info!(
            payment_id = %payment.id,
            amount = %payment.amount,
            sale_status = ?sale_status,
            client_balance = ?client_balance,
            "Payment recorded"
        );

        Ok(PaymentOutcome {
            payment,
            sale_status,
            client_balance,
        })
    }

    /// Takes a deposit (acompte) onto a client account.
    pub async fn record_deposit(&self, request: DepositRequest) -> ServiceResult<PaymentOutcome> {
        let client_id = request.client_id.ok_or(CoreError::ClientRequired)?;
        validate_payment_amount(request.amount)?;

        let mut tx = self.db.pool().begin().await?;
        let client = self.require_client(&mut tx, &client_id).await?;

        let effect = ledger::deposit_effect(request.amount);
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            sale_id: None,
            client_id: Some(client.id.clone()),
            amount: request.amount,
            mode: request.mode,
            payment_type: PaymentType::Deposit,
            reference: request.reference,
            notes: request.notes,
            balance_effect: effect,
            created_at: Utc::now(),
        };
        self.db.payments().insert(&mut tx, &payment).await?;
        let balance = self.apply_effect(&mut tx, &client.id, effect).await?;

        tx.commit().await?;

        info!(
            client = %client.name,
            amount = %payment.amount,
            balance = %balance,
            "Deposit recorded"
        );

        Ok(PaymentOutcome {
            payment,
            sale_status: None,
            client_balance: Some(balance),
        })
    }

    /// Pays (part of) a sale out of the credit held on a client account.
    pub async fn use_credit(
        &self,
        client_id: &str,
        sale_id: &str,
        amount: Money,
    ) -> ServiceResult<PaymentOutcome> {
        validate_payment_amount(amount)?;

        let mut tx = self.db.pool().begin().await?;
        let client = self.require_client(&mut tx, client_id).await?;
        let sale = self.require_sale(&mut tx, sale_id).await?;

        if sale.status == SaleStatus::Cancelled {
            return Err(CoreError::InvalidSaleStatus {
                number: sale.number,
                current: sale.status.to_string(),
                operation: "paid from credit".to_string(),
            }
            .into());
        }
        if sale.client_id.as_deref().is_some_and(|id| id != client.id) {
            return Err(ServiceError::business(format!(
                "Sale {} belongs to another client than {}",
                sale.number, client.name
            )));
        }

        ledger::check_credit_usage(client.balance, amount)?;

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            sale_id: Some(sale.id.clone()),
            client_id: Some(client.id.clone()),
            amount,
            mode: PaymentMode::Credit,
            payment_type: PaymentType::Settlement,
            reference: Some(format!("AVOIR-{}", sale.number)),
            notes: None,
            balance_effect: ledger::credit_use_effect(amount),
            created_at: now,
        };
        self.db.payments().insert(&mut tx, &payment).await?;

        // Guarded update: fails if another payment spent the credit meanwhile
        let balance = self
            .db
            .clients()
            .spend_credit(&mut tx, &client.id, amount, now)
            .await?
            .ok_or_else(|| {
                DbError::Conflict(format!("Credit of {} changed, please retry", client.name))
            })?;

        let status = self.refresh_in(&mut tx, &sale).await?;
        tx.commit().await?;

        info!(
            client = %client.name,
            sale = %sale.number,
            amount = %amount,
            balance = %balance,
            "Credit used"
        );

        Ok(PaymentOutcome {
            payment,
            sale_status: Some(status),
            client_balance: Some(balance),
        })
    }

    /// Recomputes a sale's status from its payments. Idempotent.
    pub async fn refresh_sale_status(&self, sale_id: &str) -> ServiceResult<SaleStatus> {
        let mut tx = self.db.pool().begin().await?;
        let sale = self.require_sale(&mut tx, sale_id).await?;
        let status = self.refresh_in(&mut tx, &sale).await?;
        tx.commit().await?;
        Ok(status)
    }

    /// A client's payments, newest first.
    pub async fn history(&self, client_id: &str) -> ServiceResult<Vec<Payment>> {
        let mut conn = self.db.pool().acquire().await?;
        self.require_client(&mut conn, client_id).await?;
        Ok(self
            .db
            .payments()
            .list_for_client(&mut conn, client_id, HISTORY_LIMIT)
            .await?)
    }

    /// Payments recorded against a sale, oldest first.
    pub async fn for_sale(&self, sale_id: &str) -> ServiceResult<Vec<Payment>> {
        let mut conn = self.db.pool().acquire().await?;
        self.require_sale(&mut conn, sale_id).await?;
        Ok(self.db.payments().list_for_sale(&mut conn, sale_id).await?)
    }

    /// Rebuilds a client's balance from the ledger and repairs it on drift.
    pub async fn reconcile_balance(&self, client_id: &str) -> ServiceResult<BalanceDrift> {
        let mut tx = self.db.pool().begin().await?;
        let client = self.require_client(&mut tx, client_id).await?;
        let drift = self.reconcile_in(&mut tx, &client).await?;
        tx.commit().await?;
        Ok(drift)
    }

    /// Reconciles every client. Returns only the accounts that had drifted.
    pub async fn reconcile_all(&self) -> ServiceResult<Vec<BalanceDrift>> {
        let mut tx = self.db.pool().begin().await?;

        let mut drifted = Vec::new();
        for id in self.db.clients().list_ids(&mut tx).await? {
            let client = self.require_client(&mut tx, &id).await?;
            let drift = self.reconcile_in(&mut tx, &client).await?;
            if !drift.is_consistent() {
                drifted.push(drift);
            }
        }

        tx.commit().await?;

        info!(drifted = drifted.len(), "Client balances reconciled");
        Ok(drifted)
    }

    // =========================================================================
    // Helpers (run on the caller's transaction)
    // =========================================================================

    async fn refresh_in(&self, conn: &mut SqliteConnection, sale: &Sale) -> ServiceResult<SaleStatus> {
        let paid = self.db.payments().total_for_sale(conn, &sale.id).await?;
        let status = ledger::settlement_status(sale.status, sale.total, paid);

        if status != sale.status {
            debug!(number = %sale.number, from = %sale.status, to = %status, "Sale status changed");
            self.db
                .sales()
                .update_status(conn, &sale.id, status, Utc::now())
                .await?;
        }

        Ok(status)
    }

    async fn reconcile_in(
        &self,
        conn: &mut SqliteConnection,
        client: &Client,
    ) -> ServiceResult<BalanceDrift> {
        let effects = self
            .db
            .payments()
            .balance_effects_for_client(conn, &client.id)
            .await?;
        let drift = BalanceDrift::new(&client.id, client.balance, client.opening_balance, effects);

        if !drift.is_consistent() {
            warn!(
                client = %client.name,
                stored = %drift.stored,
                computed = %drift.computed,
                "Client balance drifted, repairing"
            );
            self.db
                .clients()
                .set_balance(conn, &client.id, drift.computed, Utc::now())
                .await?;
        }

        Ok(drift)
    }

    async fn apply_effect(
        &self,
        conn: &mut SqliteConnection,
        client_id: &str,
        effect: Money,
    ) -> ServiceResult<Money> {
        self.db
            .clients()
            .apply_balance_delta(conn, client_id, effect, Utc::now())
            .await?
            .ok_or_else(|| ServiceError::not_found("Client", client_id))
    }

    async fn require_sale(&self, conn: &mut SqliteConnection, id: &str) -> ServiceResult<Sale> {
        self.db
            .sales()
            .get_by_id(conn, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Sale", id))
    }

    async fn require_client(&self, conn: &mut SqliteConnection, id: &str) -> ServiceResult<Client> {
        self.db
            .clients()
            .get_by_id(conn, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Client", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MissingStockPolicy;
    use crate::error::ErrorCode;
    use crate::sales::{CreateSaleRequest, SalesService};
    use crate::test_support::{self, Shop};
    use ndayane_core::pricing::SaleLineInput;

    /// A held sale of `quantity` × 1000 for `client`.
    async fn held_sale(shop: &Shop, client_id: Option<&str>, quantity: i64) -> Sale {
        let product = shop.product(&format!("REF-{}", Uuid::new_v4()), 1000).await;
        SalesService::new(shop.db.clone(), MissingStockPolicy::Skip)
            .create(
                CreateSaleRequest {
                    client_id: client_id.map(str::to_string),
                    lines: vec![SaleLineInput {
                        product_id: product.id,
                        quantity,
                        unit_price: None,
                        discount: None,
                    }],
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap()
            .sale
    }

    fn deposit(client_id: Option<&str>, amount: i64) -> DepositRequest {
        DepositRequest {
            client_id: client_id.map(str::to_string),
            amount: Money::new(amount),
            mode: PaymentMode::Cash,
            reference: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_deposit_then_credit_usage() {
        let shop = test_support::shop().await;
        let client = shop.client("Entreprise Fall BTP", 0).await;
        let sale = held_sale(&shop, Some(&client.id), 3).await;
        let service = PaymentsService::new(shop.db.clone());

        let outcome = service.record_deposit(deposit(Some(&client.id), 2000)).await.unwrap();
        assert_eq!(outcome.payment.payment_type, PaymentType::Deposit);
        assert_eq!(outcome.payment.balance_effect, Money::new(-2000));
        assert_eq!(outcome.client_balance, Some(Money::new(-2000)));
        assert_eq!(shop.balance(&client.id).await, Money::new(-2000));

        // More than held: refused, nothing written
        let err = service
            .use_credit(&client.id, &sale.id, Money::new(2500))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessRule);
        assert!(err.message.contains("Insufficient credit"));
        assert_eq!(shop.balance(&client.id).await, Money::new(-2000));
        assert_eq!(shop.payment_count().await, 1);

        let outcome = service
            .use_credit(&client.id, &sale.id, Money::new(1500))
            .await
            .unwrap();
        assert_eq!(outcome.payment.mode, PaymentMode::Credit);
        assert_eq!(outcome.payment.payment_type, PaymentType::Settlement);
        assert_eq!(outcome.client_balance, Some(Money::new(-500)));
        assert_eq!(outcome.sale_status, Some(SaleStatus::PartiallyPaid));
        assert_eq!(shop.balance(&client.id).await, Money::new(-500));
    }

    #[tokio::test]
    async fn test_deposit_rejections_have_no_side_effects() {
        let shop = test_support::shop().await;
        let client = shop.client("Mamadou Sarr", 0).await;
        let service = PaymentsService::new(shop.db.clone());

        let err = service.record_deposit(deposit(None, 2000)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessRule);

        let err = service.record_deposit(deposit(Some(&client.id), 0)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = service.record_deposit(deposit(Some(&client.id), -500)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = service.record_deposit(deposit(Some("ghost"), 500)).await.unwrap_err();
        assert!(err.is_not_found());

        assert_eq!(shop.payment_count().await, 0);
        assert_eq!(shop.balance(&client.id).await, Money::zero());
    }

    #[tokio::test]
    async fn test_credit_with_nothing_held() {
        let shop = test_support::shop().await;
        // Positive balance: client owes money, no credit available
        let client = shop.client("Débiteur", 5000).await;
        let sale = held_sale(&shop, Some(&client.id), 1).await;
        let service = PaymentsService::new(shop.db.clone());

        let err = service
            .use_credit(&client.id, &sale.id, Money::new(100))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessRule);
        assert_eq!(shop.balance(&client.id).await, Money::new(5000));
    }

    #[tokio::test]
    async fn test_credit_refused_for_cancelled_or_foreign_sale() {
        let shop = test_support::shop().await;
        let client = shop.client("Entreprise Fall BTP", 0).await;
        let other = shop.client("Awa Ndiaye", 0).await;
        let service = PaymentsService::new(shop.db.clone());
        service.record_deposit(deposit(Some(&client.id), 5000)).await.unwrap();

        let cancelled = held_sale(&shop, Some(&client.id), 1).await;
        SalesService::new(shop.db.clone(), MissingStockPolicy::Skip)
            .cancel(&cancelled.id)
            .await
            .unwrap();
        let err = service
            .use_credit(&client.id, &cancelled.id, Money::new(1000))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessRule);
        assert!(err.message.contains("ANNULEE"));

        let foreign = held_sale(&shop, Some(&other.id), 1).await;
        let err = service
            .use_credit(&client.id, &foreign.id, Money::new(1000))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessRule);
        assert!(err.message.contains("another client"));

        assert_eq!(shop.balance(&client.id).await, Money::new(-5000));
        assert_eq!(shop.payment_count().await, 1);

        // A sale without a client can still be paid from credit
        let walk_in = held_sale(&shop, None, 1).await;
        let outcome = service
            .use_credit(&client.id, &walk_in.id, Money::new(1000))
            .await
            .unwrap();
        assert_eq!(outcome.sale_status, Some(SaleStatus::Paid));
    }

    #[tokio::test]
    async fn test_sale_status_from_payments() {
        let shop = test_support::shop().await;
        let sale = held_sale(&shop, None, 5).await;
        let service = PaymentsService::new(shop.db.clone());

        // Nothing paid: unchanged, and idempotent
        assert_eq!(service.refresh_sale_status(&sale.id).await.unwrap(), SaleStatus::Pending);
        assert_eq!(service.refresh_sale_status(&sale.id).await.unwrap(), SaleStatus::Pending);

        let pay = |amount| RecordPaymentRequest {
            sale_id: Some(sale.id.clone()),
            client_id: None,
            amount: Money::new(amount),
            mode: PaymentMode::MobileMoney,
            payment_type: None,
            reference: Some("OM-778899".to_string()),
            notes: None,
        };

        let outcome = service.record(pay(2000)).await.unwrap();
        assert_eq!(outcome.sale_status, Some(SaleStatus::PartiallyPaid));
        assert_eq!(outcome.client_balance, None);

        let outcome = service.record(pay(3000)).await.unwrap();
        assert_eq!(outcome.sale_status, Some(SaleStatus::Paid));

        assert_eq!(service.refresh_sale_status(&sale.id).await.unwrap(), SaleStatus::Paid);
        assert_eq!(service.refresh_sale_status(&sale.id).await.unwrap(), SaleStatus::Paid);
        assert_eq!(service.for_sale(&sale.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_sale_status_is_kept() {
        let shop = test_support::shop().await;
        let sale = held_sale(&shop, None, 1).await;
        SalesService::new(shop.db.clone(), MissingStockPolicy::Skip)
            .cancel(&sale.id)
            .await
            .unwrap();

        let service = PaymentsService::new(shop.db.clone());
        let outcome = service
            .record(RecordPaymentRequest {
                sale_id: Some(sale.id.clone()),
                client_id: None,
                amount: Money::new(1000),
                mode: PaymentMode::Cash,
                payment_type: None,
                reference: None,
                notes: None,
            })
            .await
            .unwrap();
        assert_eq!(outcome.sale_status, Some(SaleStatus::Cancelled));
    }

    #[tokio::test]
    async fn test_debt_settlement_and_balance_effects() {
        let shop = test_support::shop().await;
        let client = shop.client("Mairie", 10_000).await;
        let sale = held_sale(&shop, Some(&client.id), 2).await;
        let service = PaymentsService::new(shop.db.clone());

        let request = |sale_id: Option<&str>, payment_type| RecordPaymentRequest {
            sale_id: sale_id.map(str::to_string),
            client_id: Some(client.id.clone()),
            amount: Money::new(4000),
            mode: PaymentMode::Check,
            payment_type,
            reference: None,
            notes: None,
        };

        // Client-only settlement reduces debt
        let outcome = service.record(request(None, None)).await.unwrap();
        assert_eq!(outcome.payment.balance_effect, Money::new(-4000));
        assert_eq!(outcome.client_balance, Some(Money::new(6000)));

        // Tied to a sale: balance untouched
        let outcome = service.record(request(Some(&sale.id), None)).await.unwrap();
        assert_eq!(outcome.payment.balance_effect, Money::zero());
        assert_eq!(shop.balance(&client.id).await, Money::new(6000));

        // Deposit type through the generic entry point: balance untouched
        let outcome = service
            .record(request(None, Some(PaymentType::Deposit)))
            .await
            .unwrap();
        assert_eq!(outcome.payment.balance_effect, Money::zero());
        assert_eq!(shop.balance(&client.id).await, Money::new(6000));

        assert_eq!(service.history(&client.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_record_validation() {
        let shop = test_support::shop().await;
        let service = PaymentsService::new(shop.db.clone());

        let base = RecordPaymentRequest {
            sale_id: None,
            client_id: None,
            amount: Money::new(1000),
            mode: PaymentMode::Cash,
            payment_type: None,
            reference: None,
            notes: None,
        };

        let err = service
            .record(RecordPaymentRequest {
                amount: Money::zero(),
                ..base.clone()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = service
            .record(RecordPaymentRequest {
                sale_id: Some("missing".into()),
                ..base.clone()
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = service
            .record(RecordPaymentRequest {
                client_id: Some("missing".into()),
                ..base
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        assert_eq!(shop.payment_count().await, 0);
    }

    #[tokio::test]
    async fn test_reconciliation() {
        let shop = test_support::shop().await;
        let client = shop.client("Entreprise Fall BTP", 1000).await;
        let untouched = shop.client("Client comptoir", 0).await;
        let service = PaymentsService::new(shop.db.clone());

        service.record_deposit(deposit(Some(&client.id), 3000)).await.unwrap();

        let drift = service.reconcile_balance(&client.id).await.unwrap();
        assert!(drift.is_consistent());
        assert_eq!(drift.computed, Money::new(-2000));
        assert!(service.reconcile_all().await.unwrap().is_empty());

        // Corrupt the cache behind the ledger's back
        {
            let mut conn = shop.db.pool().acquire().await.unwrap();
            shop.db
                .clients()
                .set_balance(&mut conn, &client.id, Money::new(750), Utc::now())
                .await
                .unwrap();
        }

        let drifted = service.reconcile_all().await.unwrap();
        assert_eq!(drifted.len(), 1);
        assert_eq!(drifted[0].client_id, client.id);
        assert_eq!(drifted[0].drift, Money::new(2750));
        assert_eq!(shop.balance(&client.id).await, Money::new(-2000));
        assert_eq!(shop.balance(&untouched.id).await, Money::zero());
    }
}
