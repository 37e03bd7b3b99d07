//! # Supplier Service

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use ndayane_core::validation::{validate_email, validate_name, validate_phone};
use ndayane_core::Supplier;
use ndayane_db::Database;

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct CreateSupplierRequest {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SupplierService {
    db: Database,
}

impl SupplierService {
    pub fn new(db: Database) -> Self {
        SupplierService { db }
    }

    pub async fn create(&self, request: CreateSupplierRequest) -> ServiceResult<Supplier> {
        validate_name("supplier name", &request.name)?;
        validate_phone(request.phone.as_deref())?;
        validate_email(request.email.as_deref())?;

        let optional = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let supplier = Supplier {
            id: Uuid::new_v4().to_string(),
            name: request.name.trim().to_string(),
            phone: optional(request.phone),
            email: optional(request.email),
            address: optional(request.address),
            is_active: true,
            created_at: Utc::now(),
        };

        let mut conn = self.db.pool().acquire().await?;
        self.db.suppliers().insert(&mut conn, &supplier).await?;

        info!(name = %supplier.name, "Supplier created");
        Ok(supplier)
    }

    pub async fn get(&self, supplier_id: &str) -> ServiceResult<Supplier> {
        let mut conn = self.db.pool().acquire().await?;
        self.db
            .suppliers()
            .get_by_id(&mut conn, supplier_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Supplier", supplier_id))
    }

    pub async fn list(&self, include_inactive: bool) -> ServiceResult<Vec<Supplier>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(self.db.suppliers().list(&mut conn, include_inactive).await?)
    }

    /// Deactivated suppliers keep their order history but take no new orders.
    pub async fn deactivate(&self, supplier_id: &str) -> ServiceResult<Supplier> {
        let mut conn = self.db.pool().acquire().await?;
        let updated = self
            .db
            .suppliers()
            .set_active(&mut conn, supplier_id, false)
            .await?;
        drop(conn);

        if !updated {
            return Err(ServiceError::not_found("Supplier", supplier_id));
        }

        info!(supplier_id = %supplier_id, "Supplier deactivated");
        self.get(supplier_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support;

    #[tokio::test]
    async fn test_supplier_lifecycle() {
        let shop = test_support::shop().await;
        let suppliers = SupplierService::new(shop.db.clone());

        let sococim = suppliers
            .create(CreateSupplierRequest {
                name: "SOCOCIM Industries".to_string(),
                phone: Some("33 839 88 88".to_string()),
                address: Some("Rufisque".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        suppliers
            .create(CreateSupplierRequest {
                name: "Quincaillerie Centrale".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(sococim.is_active);
        assert_eq!(suppliers.get(&sococim.id).await.unwrap().name, "SOCOCIM Industries");
        assert_eq!(suppliers.list(false).await.unwrap().len(), 2);

        let off = suppliers.deactivate(&sococim.id).await.unwrap();
        assert!(!off.is_active);
        assert_eq!(suppliers.list(false).await.unwrap().len(), 1);
        assert_eq!(suppliers.list(true).await.unwrap().len(), 2);

        assert!(suppliers.deactivate("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_create_validation() {
        let shop = test_support::shop().await;
        let suppliers = SupplierService::new(shop.db.clone());

        let err = suppliers
            .create(CreateSupplierRequest {
                name: "  ".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = suppliers
            .create(CreateSupplierRequest {
                name: "Fournisseur".to_string(),
                phone: Some("abc".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
