//! # Catalog Service
//!
//! Products: creation, prices, deactivation and lookup. Products are never
//! deleted; a deactivated product can no longer be sold or ordered.

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqliteConnection;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use ndayane_core::validation::{
    validate_name, validate_price, validate_reference, validate_search_query,
};
use ndayane_core::{Money, Product, ValidationError};
use ndayane_db::Database;

const DEFAULT_UNIT: &str = "pièce";
const DEFAULT_LIMIT: u32 = 50;

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateProductRequest {
    pub reference: String,
    pub name: String,
    pub purchase_price: Money,
    pub sale_price: Money,
    /// "pièce" when absent.
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub min_stock: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    pub fn new(db: Database) -> Self {
        CatalogService { db }
    }

    pub async fn create(&self, request: CreateProductRequest) -> ServiceResult<Product> {
        let reference = request.reference.trim().to_uppercase();
        validate_reference(&reference)?;
        validate_name("name", &request.name)?;
        validate_price("purchase price", request.purchase_price)?;
        validate_price("sale price", request.sale_price)?;

        let min_stock = request.min_stock.unwrap_or(0);
        if min_stock < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "min stock".to_string(),
            }
            .into());
        }

        let unit = request
            .unit
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_UNIT.to_string());

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            reference,
            name: request.name.trim().to_string(),
            purchase_price: request.purchase_price,
            sale_price: request.sale_price,
            unit,
            min_stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.db.pool().acquire().await?;
        if self
            .db
            .products()
            .get_by_reference(&mut conn, &product.reference)
            .await?
            .is_some()
        {
            return Err(ServiceError::validation(format!(
                "Reference '{}' already exists",
                product.reference
            )));
        }
        self.db.products().insert(&mut conn, &product).await?;

        info!(reference = %product.reference, name = %product.name, "Product created");
        Ok(product)
    }

    pub async fn update_prices(
        &self,
        product_id: &str,
        purchase_price: Money,
        sale_price: Money,
    ) -> ServiceResult<Product> {
        validate_price("purchase price", purchase_price)?;
        validate_price("sale price", sale_price)?;

        let mut conn = self.db.pool().acquire().await?;
        let updated = self
            .db
            .products()
            .update_prices(&mut conn, product_id, purchase_price, sale_price, Utc::now())
            .await?;
        if !updated {
            return Err(ServiceError::not_found("Product", product_id));
        }

        info!(product_id = %product_id, sale_price = %sale_price, "Product prices updated");
        self.read_back(&mut conn, product_id).await
    }

    pub async fn deactivate(&self, product_id: &str) -> ServiceResult<Product> {
        self.set_active(product_id, false).await
    }

    pub async fn reactivate(&self, product_id: &str) -> ServiceResult<Product> {
        self.set_active(product_id, true).await
    }

    pub async fn get(&self, product_id: &str) -> ServiceResult<Product> {
        let mut conn = self.db.pool().acquire().await?;
        self.db
            .products()
            .get_by_id(&mut conn, product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))
    }

    pub async fn get_by_reference(&self, reference: &str) -> ServiceResult<Product> {
        let reference = reference.trim().to_uppercase();
        let mut conn = self.db.pool().acquire().await?;
        self.db
            .products()
            .get_by_reference(&mut conn, &reference)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", &reference))
    }

    pub async fn list_active(&self, limit: Option<u32>) -> ServiceResult<Vec<Product>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(self
            .db
            .products()
            .list_active(&mut conn, limit.unwrap_or(DEFAULT_LIMIT))
            .await?)
    }

    /// Active products whose name or reference contains `query`.
    pub async fn search(&self, query: &str, limit: Option<u32>) -> ServiceResult<Vec<Product>> {
        let query = validate_search_query(query)?;
        let mut conn = self.db.pool().acquire().await?;
        Ok(self
            .db
            .products()
            .search(&mut conn, &query, limit.unwrap_or(DEFAULT_LIMIT))
            .await?)
    }

    async fn set_active(&self, product_id: &str, active: bool) -> ServiceResult<Product> {
        let mut conn = self.db.pool().acquire().await?;
        let updated = self
            .db
            .products()
            .set_active(&mut conn, product_id, active, Utc::now())
            .await?;

        if !updated {
            return Err(ServiceError::not_found("Product", product_id));
        }

        info!(product_id = %product_id, active, "Product active flag changed");
        self.read_back(&mut conn, product_id).await
    }

    /// Re-reads a product on the connection that just wrote it.
    async fn read_back(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
    ) -> ServiceResult<Product> {
        self.db
            .products()
            .get_by_id(conn, product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support;

    fn request(reference: &str, name: &str) -> CreateProductRequest {
        CreateProductRequest {
            reference: reference.to_string(),
            name: name.to_string(),
            purchase_price: Money::new(3600),
            sale_price: Money::new(4750),
            unit: Some("sac".to_string()),
            min_stock: Some(20),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let shop = test_support::shop().await;
        let catalog = CatalogService::new(shop.db.clone());

        let ciment = catalog
            .create(request(" cim-45 ", "Ciment CPJ 45 50kg"))
            .await
            .unwrap();
        assert_eq!(ciment.reference, "CIM-45");
        assert_eq!(ciment.unit, "sac");
        assert!(ciment.is_active);

        assert_eq!(catalog.get_by_reference("cim-45").await.unwrap().id, ciment.id);
        assert_eq!(catalog.search("ciment", None).await.unwrap().len(), 1);
        assert_eq!(catalog.list_active(None).await.unwrap().len(), 1);

        let err = catalog
            .create(request("CIM-45", "Autre ciment"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let shop = test_support::shop().await;
        let catalog = CatalogService::new(shop.db.clone());

        let mut bad = request("VIS-1", "Vis");
        bad.sale_price = Money::new(-1);
        assert_eq!(
            catalog.create(bad).await.unwrap_err().code,
            ErrorCode::ValidationError
        );

        let mut bad = request("VIS-1", "Vis");
        bad.min_stock = Some(-3);
        assert_eq!(
            catalog.create(bad).await.unwrap_err().code,
            ErrorCode::ValidationError
        );

        assert_eq!(
            catalog.create(request("", "Vis")).await.unwrap_err().code,
            ErrorCode::ValidationError
        );

        let mut defaults = request("VIS-2", "Vis à bois");
        defaults.unit = None;
        defaults.min_stock = None;
        let product = catalog.create(defaults).await.unwrap();
        assert_eq!(product.unit, "pièce");
        assert_eq!(product.min_stock, 0);
    }

    #[tokio::test]
    async fn test_prices_and_deactivation() {
        let shop = test_support::shop().await;
        let catalog = CatalogService::new(shop.db.clone());
        let ciment = catalog.create(request("CIM-45", "Ciment")).await.unwrap();

        let repriced = catalog
            .update_prices(&ciment.id, Money::new(3800), Money::new(5000))
            .await
            .unwrap();
        assert_eq!(repriced.sale_price, Money::new(5000));
        assert_eq!(repriced.purchase_price, Money::new(3800));

        let off = catalog.deactivate(&ciment.id).await.unwrap();
        assert!(!off.is_active);
        assert!(catalog.list_active(None).await.unwrap().is_empty());

        let on = catalog.reactivate(&ciment.id).await.unwrap();
        assert!(on.is_active);

        assert!(catalog.deactivate("missing").await.unwrap_err().is_not_found());
        assert!(catalog
            .update_prices("missing", Money::new(1), Money::new(2))
            .await
            .unwrap_err()
            .is_not_found());
    }
}
