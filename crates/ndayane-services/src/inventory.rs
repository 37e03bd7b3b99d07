//! # Inventory Service
//!
//! Warehouses (dépôts), stock per warehouse, manual adjustments, transfers
//! and low-stock alerts. Every stock change writes a movement row.
//!
//! ## Transfer
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  transfer(product, from, to, qty)                 one transaction       │
//! │                                                                         │
//! │  from == to? ──────────────────────► VALIDATION_ERROR                   │
//! │  source quantity < qty? ───────────► BUSINESS_RULE (InsufficientStock)  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  source      -= qty   TRANSFERT_SORTIE  (-qty)                          │
//! │  destination += qty   TRANSFERT_ENTREE  (+qty, row created if absent)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unlike a sale, a transfer never drives the source negative.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use ndayane_core::validation::{validate_name, validate_quantity};
use ndayane_core::{CoreError, StockMovement, StockMovementReason, ValidationError, Warehouse};
use ndayane_db::repository::report::LowStockItem;
use ndayane_db::repository::stock::WarehouseStock;
use ndayane_db::Database;

const MOVEMENT_LIMIT: u32 = 100;

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateWarehouseRequest {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub is_principal: bool,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct TransferRequest {
    pub product_id: String,
    pub from_warehouse_id: String,
    pub to_warehouse_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Stock of one product: total and per warehouse.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ProductStock {
    pub product_id: String,
    pub total: i64,
    pub levels: Vec<WarehouseStock>,
}

#[derive(Debug, Clone)]
pub struct InventoryService {
    db: Database,
}

impl InventoryService {
    pub fn new(db: Database) -> Self {
        InventoryService { db }
    }

    // =========================================================================
    // Warehouses
    // =========================================================================

    pub async fn create_warehouse(
        &self,
        request: CreateWarehouseRequest,
    ) -> ServiceResult<Warehouse> {
        validate_name("warehouse name", &request.name)?;

        let mut warehouse = Warehouse {
            id: Uuid::new_v4().to_string(),
            name: request.name.trim().to_string(),
            location: request
                .location
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
            is_principal: false,
            created_at: Utc::now(),
        };

        let mut tx = self.db.pool().begin().await?;
        self.db.warehouses().insert(&mut tx, &warehouse).await?;
        if request.is_principal {
            self.db.warehouses().set_principal(&mut tx, &warehouse.id).await?;
            warehouse.is_principal = true;
        }
        tx.commit().await?;

        info!(name = %warehouse.name, principal = warehouse.is_principal, "Warehouse created");
        Ok(warehouse)
    }

    /// Makes a warehouse the principal one, clearing the flag elsewhere.
    pub async fn set_principal(&self, warehouse_id: &str) -> ServiceResult<Warehouse> {
        let mut tx = self.db.pool().begin().await?;
        if !self.db.warehouses().set_principal(&mut tx, warehouse_id).await? {
            return Err(ServiceError::not_found("Warehouse", warehouse_id));
        }
        let warehouse = self
            .db
            .warehouses()
            .get_by_id(&mut tx, warehouse_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Warehouse", warehouse_id))?;
        tx.commit().await?;

        info!(name = %warehouse.name, "Principal warehouse changed");
        Ok(warehouse)
    }

    pub async fn list_warehouses(&self) -> ServiceResult<Vec<Warehouse>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(self.db.warehouses().list(&mut conn).await?)
    }

    // =========================================================================
    // Stock
    // =========================================================================

    pub async fn stock_by_warehouse(&self, product_id: &str) -> ServiceResult<ProductStock> {
        let mut conn = self.db.pool().acquire().await?;
        if self.db.products().get_by_id(&mut conn, product_id).await?.is_none() {
            return Err(ServiceError::not_found("Product", product_id));
        }

        let levels = self.db.stock().levels_for_product(&mut conn, product_id).await?;
        let total = levels.iter().map(|l| l.quantity).sum();

        Ok(ProductStock {
            product_id: product_id.to_string(),
            total,
            levels,
        })
    }

    /// Applies a signed correction (inventory count, breakage) to one warehouse.
    ///
    /// Returns the new quantity. The warehouse defaults to the principal one.
    pub async fn adjust(
        &self,
        product_id: &str,
        warehouse_id: Option<&str>,
        delta: i64,
        reason: Option<String>,
    ) -> ServiceResult<i64> {
        if delta == 0 {
            return Err(ValidationError::InvalidFormat {
                field: "delta".to_string(),
                reason: "must not be zero".to_string(),
            }
            .into());
        }
        validate_quantity(delta.abs())?;

        let mut tx = self.db.pool().begin().await?;
        if self.db.products().get_by_id(&mut tx, product_id).await?.is_none() {
            return Err(ServiceError::not_found("Product", product_id));
        }
        let warehouse = self.db.warehouses().resolve(&mut tx, warehouse_id).await?;

        let now = Utc::now();
        let quantity = self
            .db
            .stock()
            .add(&mut tx, product_id, &warehouse.id, delta, now)
            .await?;
        self.db
            .stock()
            .record_movement(
                &mut tx,
                &StockMovement {
                    id: Uuid::new_v4().to_string(),
                    product_id: product_id.to_string(),
                    warehouse_id: warehouse.id.clone(),
                    delta,
                    reason: StockMovementReason::Adjustment,
                    reference: reason,
                    created_at: now,
                },
            )
            .await?;
        tx.commit().await?;

        info!(
            product_id = %product_id,
            warehouse = %warehouse.name,
            delta,
            quantity,
            "Stock adjusted"
        );
        Ok(quantity)
    }

    pub async fn transfer(&self, request: TransferRequest) -> ServiceResult<ProductStock> {
        validate_quantity(request.quantity)?;
        if request.from_warehouse_id == request.to_warehouse_id {
            return Err(ValidationError::InvalidFormat {
                field: "destination warehouse".to_string(),
                reason: "must differ from the source warehouse".to_string(),
            }
            .into());
        }

        let mut tx = self.db.pool().begin().await?;
        if self
            .db
            .products()
            .get_by_id(&mut tx, &request.product_id)
            .await?
            .is_none()
        {
            return Err(ServiceError::not_found("Product", &request.product_id));
        }
        let source = self
            .db
            .warehouses()
            .resolve(&mut tx, Some(&request.from_warehouse_id))
            .await?;
        let destination = self
            .db
            .warehouses()
            .resolve(&mut tx, Some(&request.to_warehouse_id))
            .await?;

        let available = self
            .db
            .stock()
            .get_level(&mut tx, &request.product_id, &source.id)
            .await?
            .map(|l| l.quantity)
            .unwrap_or(0);
        if available < request.quantity {
            return Err(CoreError::InsufficientStock {
                product_id: request.product_id.clone(),
                available,
                requested: request.quantity,
            }
            .into());
        }

        let now = Utc::now();
        debug!(from = %source.name, to = %destination.name, quantity = request.quantity, "Transferring stock");

        self.db
            .stock()
            .decrement_existing(&mut tx, &request.product_id, &source.id, request.quantity, now)
            .await?;
        self.db
            .stock()
            .add(&mut tx, &request.product_id, &destination.id, request.quantity, now)
            .await?;

        for (warehouse_id, delta, reason) in [
            (&source.id, -request.quantity, StockMovementReason::TransferOut),
            (&destination.id, request.quantity, StockMovementReason::TransferIn),
        ] {
            self.db
                .stock()
                .record_movement(
                    &mut tx,
                    &StockMovement {
                        id: Uuid::new_v4().to_string(),
                        product_id: request.product_id.clone(),
                        warehouse_id: warehouse_id.clone(),
                        delta,
                        reason,
                        reference: request.reference.clone(),
                        created_at: now,
                    },
                )
                .await?;
        }

        let levels = self
            .db
            .stock()
            .levels_for_product(&mut tx, &request.product_id)
            .await?;
        tx.commit().await?;

        info!(
            product_id = %request.product_id,
            from = %source.name,
            to = %destination.name,
            quantity = request.quantity,
            "Stock transferred"
        );

        Ok(ProductStock {
            product_id: request.product_id,
            total: levels.iter().map(|l| l.quantity).sum(),
            levels,
        })
    }

    /// Active products whose total stock is below their minimum.
    pub async fn low_stock(&self) -> ServiceResult<Vec<LowStockItem>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(self.db.reports().low_stock(&mut conn).await?)
    }

    /// Movement journal of a product, newest first.
    pub async fn movements(
        &self,
        product_id: &str,
        limit: Option<u32>,
    ) -> ServiceResult<Vec<StockMovement>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(self
            .db
            .stock()
            .movements_for_product(&mut conn, product_id, limit.unwrap_or(MOVEMENT_LIMIT))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support;

    fn depot(name: &str) -> CreateWarehouseRequest {
        CreateWarehouseRequest {
            name: name.to_string(),
            location: Some("Route de Rufisque".to_string()),
            is_principal: false,
        }
    }

    #[tokio::test]
    async fn test_warehouses_and_principal() {
        let shop = test_support::shop().await;
        let inventory = InventoryService::new(shop.db.clone());

        let annexe = inventory.create_warehouse(depot("Dépôt annexe")).await.unwrap();
        assert!(!annexe.is_principal);

        let mut request = depot("Nouveau magasin");
        request.is_principal = true;
        let nouveau = inventory.create_warehouse(request).await.unwrap();
        assert!(nouveau.is_principal);

        let all = inventory.list_warehouses().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all.iter().filter(|w| w.is_principal).count(), 1);
        assert_eq!(all[0].id, nouveau.id);

        let back = inventory.set_principal(&shop.principal.id).await.unwrap();
        assert!(back.is_principal);
        let all = inventory.list_warehouses().await.unwrap();
        assert_eq!(all.iter().filter(|w| w.is_principal).count(), 1);

        assert!(inventory.set_principal("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_adjust_records_movement() {
        let shop = test_support::shop().await;
        let inventory = InventoryService::new(shop.db.clone());
        let fer = shop.product("FER-8", 2500).await;

        let quantity = inventory
            .adjust(&fer.id, None, 12, Some("Inventaire".to_string()))
            .await
            .unwrap();
        assert_eq!(quantity, 12);

        let quantity = inventory.adjust(&fer.id, None, -2, None).await.unwrap();
        assert_eq!(quantity, 10);

        let movements = inventory.movements(&fer.id, None).await.unwrap();
        assert_eq!(movements.len(), 2);
        assert!(movements
            .iter()
            .all(|m| m.reason == StockMovementReason::Adjustment));

        let err = inventory.adjust(&fer.id, None, 0, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(inventory
            .adjust("missing", None, 1, None)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_transfer_moves_both_rows() {
        let shop = test_support::shop().await;
        let inventory = InventoryService::new(shop.db.clone());
        let annexe = inventory.create_warehouse(depot("Dépôt annexe")).await.unwrap();
        let tole = shop.product("TOLE-3M", 6000).await;
        shop.stock(&tole.id, &shop.principal.id, 30).await;

        let stock = inventory
            .transfer(TransferRequest {
                product_id: tole.id.clone(),
                from_warehouse_id: shop.principal.id.clone(),
                to_warehouse_id: annexe.id.clone(),
                quantity: 12,
                reference: Some("Chantier Bargny".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(stock.total, 30);
        assert_eq!(shop.level(&tole.id, &shop.principal.id).await, Some(18));
        assert_eq!(shop.level(&tole.id, &annexe.id).await, Some(12));

        let movements = inventory.movements(&tole.id, None).await.unwrap();
        let deltas: Vec<(StockMovementReason, i64)> =
            movements.iter().map(|m| (m.reason, m.delta)).collect();
        assert!(deltas.contains(&(StockMovementReason::TransferOut, -12)));
        assert!(deltas.contains(&(StockMovementReason::TransferIn, 12)));
    }

    #[tokio::test]
    async fn test_transfer_rejections() {
        let shop = test_support::shop().await;
        let inventory = InventoryService::new(shop.db.clone());
        let annexe = inventory.create_warehouse(depot("Dépôt annexe")).await.unwrap();
        let tole = shop.product("TOLE-3M", 6000).await;
        shop.stock(&tole.id, &shop.principal.id, 5).await;

        let short = inventory
            .transfer(TransferRequest {
                product_id: tole.id.clone(),
                from_warehouse_id: shop.principal.id.clone(),
                to_warehouse_id: annexe.id.clone(),
                quantity: 6,
                reference: None,
            })
            .await
            .unwrap_err();
        assert_eq!(short.code, ErrorCode::BusinessRule);
        assert_eq!(shop.level(&tole.id, &shop.principal.id).await, Some(5));
        assert_eq!(shop.level(&tole.id, &annexe.id).await, None);

        let same = inventory
            .transfer(TransferRequest {
                product_id: tole.id.clone(),
                from_warehouse_id: annexe.id.clone(),
                to_warehouse_id: annexe.id.clone(),
                quantity: 1,
                reference: None,
            })
            .await
            .unwrap_err();
        assert_eq!(same.code, ErrorCode::ValidationError);

        let unknown = inventory
            .transfer(TransferRequest {
                product_id: tole.id.clone(),
                from_warehouse_id: shop.principal.id.clone(),
                to_warehouse_id: "missing".to_string(),
                quantity: 1,
                reference: None,
            })
            .await
            .unwrap_err();
        assert!(unknown.is_not_found());
    }

    #[tokio::test]
    async fn test_stock_view_and_low_stock() {
        let shop = test_support::shop().await;
        let inventory = InventoryService::new(shop.db.clone());
        let annexe = inventory.create_warehouse(depot("Dépôt annexe")).await.unwrap();
        let vis = shop.product("VIS-6X40", 100).await;
        let clou = shop.product("CLOU-70", 50).await;
        shop.stock(&vis.id, &shop.principal.id, 2).await;
        shop.stock(&vis.id, &annexe.id, 2).await;
        shop.stock(&clou.id, &shop.principal.id, 40).await;

        let stock = inventory.stock_by_warehouse(&vis.id).await.unwrap();
        assert_eq!(stock.total, 4);
        assert_eq!(stock.levels.len(), 2);
        assert!(stock.levels[0].is_principal);

        // min_stock is 5 for fixture products
        let low = inventory.low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].product_id, vis.id);
        assert_eq!(low[0].quantity, 4);

        assert!(inventory
            .stock_by_warehouse("missing")
            .await
            .unwrap_err()
            .is_not_found());
    }
}
