//! # Report Service
//!
//! Daily summary, best sellers and the back-office dashboard.
//!
//! ```text
//! Dashboard
//! ├── today: DailySummary
//! │     ├── sales per status (all statuses)
//! │     ├── revenue (excludes EN_ATTENTE and ANNULEE)
//! │     ├── collected per payment mode (REGLEMENT only)
//! │     └── deposits (ACOMPTE)
//! ├── stock value at purchase price
//! ├── low-stock product count
//! ├── outstanding debt / credit held
//! └── open purchase orders
//! ```

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;
use ts_rs::TS;

use crate::error::{ServiceError, ServiceResult};
use ndayane_core::Money;
use ndayane_db::repository::report::{ModeTotal, StatusCount, TopProduct};
use ndayane_db::Database;

const TOP_PRODUCTS_LIMIT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct DailySummary {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub sales_by_status: Vec<StatusCount>,
    pub sale_count: i64,
    pub revenue: Money,
    pub collected_by_mode: Vec<ModeTotal>,
    pub collected_total: Money,
    pub deposits: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct Dashboard {
    pub today: DailySummary,
    pub stock_value: Money,
    pub low_stock_count: i64,
    pub outstanding_debt: Money,
    pub credit_held: Money,
    pub open_purchase_orders: i64,
}

#[derive(Debug, Clone)]
pub struct ReportService {
    db: Database,
}

impl ReportService {
    pub fn new(db: Database) -> Self {
        ReportService { db }
    }

    pub async fn daily_summary(&self, date: NaiveDate) -> ServiceResult<DailySummary> {
        let (from, to) = day_bounds(date)?;
        debug!(%date, "Building daily summary");

        let mut conn = self.db.pool().acquire().await?;
        let reports = self.db.reports();

        let sales_by_status = reports.sale_counts_by_status(&mut conn, from, to).await?;
        let revenue = reports.revenue(&mut conn, from, to).await?;
        let collected_by_mode = reports.settlements_by_mode(&mut conn, from, to).await?;
        let deposits = reports.deposits(&mut conn, from, to).await?;

        Ok(DailySummary {
            date,
            sale_count: sales_by_status.iter().map(|s| s.count).sum(),
            collected_total: collected_by_mode.iter().map(|m| m.amount).sum(),
            sales_by_status,
            revenue,
            collected_by_mode,
            deposits,
        })
    }

    /// Best sellers by quantity between two dates, both inclusive.
    pub async fn top_products(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        limit: Option<u32>,
    ) -> ServiceResult<Vec<TopProduct>> {
        if to < from {
            return Err(ServiceError::validation(format!(
                "Period end {} is before its start {}",
                to, from
            )));
        }
        let (start, _) = day_bounds(from)?;
        let (_, end) = day_bounds(to)?;

        let mut conn = self.db.pool().acquire().await?;
        Ok(self
            .db
            .reports()
            .top_products(&mut conn, start, end, limit.unwrap_or(TOP_PRODUCTS_LIMIT))
            .await?)
    }

    pub async fn dashboard(&self) -> ServiceResult<Dashboard> {
        self.dashboard_for(Utc::now().date_naive()).await
    }

    /// Dashboard with `today` pinned to a given date.
    pub async fn dashboard_for(&self, date: NaiveDate) -> ServiceResult<Dashboard> {
        let today = self.daily_summary(date).await?;

        let mut conn = self.db.pool().acquire().await?;
        let reports = self.db.reports();

        Ok(Dashboard {
            today,
            stock_value: reports.stock_value(&mut conn).await?,
            low_stock_count: reports.low_stock(&mut conn).await?.len() as i64,
            outstanding_debt: reports.outstanding_debt(&mut conn).await?,
            credit_held: reports.credit_held(&mut conn).await?,
            open_purchase_orders: self.db.purchase_orders().count_open(&mut conn).await?,
        })
    }
}

/// `[date 00:00 UTC, next day 00:00 UTC)`.
fn day_bounds(date: NaiveDate) -> ServiceResult<(DateTime<Utc>, DateTime<Utc>)> {
    let start = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ServiceError::validation(format!("Invalid date {}", date)))?
        .and_utc();
    Ok((start, start + Duration::days(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MissingStockPolicy;
    use crate::payments::{DepositRequest, PaymentsService};
    use crate::sales::{CreateSaleRequest, SalesService};
    use ndayane_core::pricing::SaleLineInput;
    use ndayane_core::{PaymentMode, SaleStatus};

    use crate::test_support;

    fn line(product_id: &str, quantity: i64) -> SaleLineInput {
        SaleLineInput {
            product_id: product_id.to_string(),
            quantity,
            unit_price: None,
            discount: None,
        }
    }

    #[tokio::test]
    async fn test_daily_summary_and_dashboard() {
        let shop = test_support::shop().await;
        let vis = shop.product("VIS-6X40", 1000).await;
        let ciment = shop.product("CIM-45", 4000).await;
        shop.stock(&vis.id, &shop.principal.id, 20).await;
        shop.stock(&ciment.id, &shop.principal.id, 3).await;
        let moussa = shop.client("Moussa Diop", 10_000).await;

        let sales = SalesService::new(shop.db.clone(), MissingStockPolicy::Skip);
        let payments = PaymentsService::new(shop.db.clone());

        sales
            .create(
                CreateSaleRequest {
                    lines: vec![line(&vis.id, 3)],
                    payment_mode: Some(PaymentMode::Cash),
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap();
        sales
            .create(
                CreateSaleRequest {
                    lines: vec![line(&ciment.id, 2)],
                    payment_mode: Some(PaymentMode::MobileMoney),
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap();
        // Held: counted per status, not in revenue
        sales
            .create(
                CreateSaleRequest {
                    lines: vec![line(&vis.id, 50)],
                    ..Default::default()
                },
                &shop.cashier.id,
            )
            .await
            .unwrap();
        payments
            .record_deposit(DepositRequest {
                client_id: Some(moussa.id.clone()),
                amount: Money::new(2_500),
                mode: PaymentMode::Cash,
                reference: None,
                notes: None,
            })
            .await
            .unwrap();

        let reports = ReportService::new(shop.db.clone());
        let today = Utc::now().date_naive();
        let summary = reports.daily_summary(today).await.unwrap();

        assert_eq!(summary.sale_count, 3);
        assert!(summary
            .sales_by_status
            .contains(&StatusCount { status: SaleStatus::Pending, count: 1 }));
        assert_eq!(summary.revenue, Money::new(11_000));
        assert_eq!(summary.collected_total, Money::new(11_000));
        assert_eq!(summary.collected_by_mode.len(), 2);
        assert_eq!(summary.deposits, Money::new(2_500));

        let yesterday = reports
            .daily_summary(today - Duration::days(1))
            .await
            .unwrap();
        assert_eq!(yesterday.sale_count, 0);
        assert_eq!(yesterday.revenue, Money::zero());

        let dashboard = reports.dashboard_for(today).await.unwrap();
        // 17 × 750 + 1 × 3000
        assert_eq!(dashboard.stock_value, Money::new(15_750));
        // CIM-45 has 1 left, below its minimum of 5
        assert_eq!(dashboard.low_stock_count, 1);
        // Deposit of 2 500 against a 10 000 debt
        assert_eq!(dashboard.outstanding_debt, Money::new(7_500));
        assert_eq!(dashboard.credit_held, Money::zero());
        assert_eq!(dashboard.open_purchase_orders, 0);
    }

    #[tokio::test]
    async fn test_top_products() {
        let shop = test_support::shop().await;
        let vis = shop.product("VIS-6X40", 1000).await;
        let clou = shop.product("CLOU-70", 200).await;
        shop.stock(&vis.id, &shop.principal.id, 50).await;
        shop.stock(&clou.id, &shop.principal.id, 50).await;

        let sales = SalesService::new(shop.db.clone(), MissingStockPolicy::Skip);
        for lines in [
            vec![line(&vis.id, 2), line(&clou.id, 10)],
            vec![line(&vis.id, 1)],
        ] {
            sales
                .create(
                    CreateSaleRequest {
                        lines,
                        payment_mode: Some(PaymentMode::Cash),
                        ..Default::default()
                    },
                    &shop.cashier.id,
                )
                .await
                .unwrap();
        }

        let reports = ReportService::new(shop.db.clone());
        let today = Utc::now().date_naive();
        let top = reports.top_products(today, today, None).await.unwrap();

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product_id, clou.id);
        assert_eq!(top[0].quantity, 10);
        assert_eq!(top[1].quantity, 3);
        assert_eq!(top[1].revenue, Money::new(3_000));

        let limited = reports.top_products(today, today, Some(1)).await.unwrap();
        assert_eq!(limited.len(), 1);

        assert!(reports
            .top_products(today, today - Duration::days(1), None)
            .await
            .is_err());
    }
}
