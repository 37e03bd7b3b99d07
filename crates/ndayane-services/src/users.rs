//! # User Service
//!
//! Back-office accounts. Authentication is handled outside this workspace;
//! here accounts are created, listed and deactivated. A deactivated cashier
//! can no longer create sales.

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use ndayane_core::validation::{validate_name, validate_username};
use ndayane_core::{User, UserRole, ValidationError};
use ndayane_db::Database;

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateUserRequest {
    pub username: String,
    pub full_name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone)]
pub struct UserService {
    db: Database,
}

impl UserService {
    pub fn new(db: Database) -> Self {
        UserService { db }
    }

    pub async fn create(&self, request: CreateUserRequest) -> ServiceResult<User> {
        let username = request.username.trim().to_lowercase();
        validate_username(&username)?;
        validate_name("full name", &request.full_name)?;

        let mut conn = self.db.pool().acquire().await?;
        if self
            .db
            .users()
            .get_by_username(&mut conn, &username)
            .await?
            .is_some()
        {
            return Err(ValidationError::Duplicate {
                field: "username".to_string(),
                value: username,
            }
            .into());
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            username,
            full_name: request.full_name.trim().to_string(),
            role: request.role,
            is_active: true,
            created_at: Utc::now(),
        };
        self.db.users().insert(&mut conn, &user).await?;

        info!(username = %user.username, role = ?user.role, "User created");
        Ok(user)
    }

    pub async fn get(&self, user_id: &str) -> ServiceResult<User> {
        let mut conn = self.db.pool().acquire().await?;
        self.db
            .users()
            .get_by_id(&mut conn, user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))
    }

    pub async fn list(&self) -> ServiceResult<Vec<User>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(self.db.users().list(&mut conn).await?)
    }

    pub async fn deactivate(&self, user_id: &str) -> ServiceResult<User> {
        let mut conn = self.db.pool().acquire().await?;
        let updated = self.db.users().set_active(&mut conn, user_id, false).await?;
        drop(conn);

        if !updated {
            return Err(ServiceError::not_found("User", user_id));
        }

        info!(user_id = %user_id, "User deactivated");
        self.get(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support;

    fn request(username: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            full_name: "Mamadou Ba".to_string(),
            role: UserRole::Manager,
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let shop = test_support::shop().await;
        let users = UserService::new(shop.db.clone());

        let mamadou = users.create(request(" Mamadou ")).await.unwrap();
        assert_eq!(mamadou.username, "mamadou");
        assert_eq!(mamadou.role, UserRole::Manager);
        assert!(mamadou.is_active);

        let all = users.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].username, "awa");
        assert_eq!(users.get(&mamadou.id).await.unwrap().full_name, "Mamadou Ba");
    }

    #[tokio::test]
    async fn test_username_rules() {
        let shop = test_support::shop().await;
        let users = UserService::new(shop.db.clone());

        let duplicate = users.create(request("AWA")).await.unwrap_err();
        assert_eq!(duplicate.code, ErrorCode::ValidationError);

        let spaced = users.create(request("awa ndiaye")).await.unwrap_err();
        assert_eq!(spaced.code, ErrorCode::ValidationError);

        let short = users.create(request("ab")).await.unwrap_err();
        assert_eq!(short.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_deactivate() {
        let shop = test_support::shop().await;
        let users = UserService::new(shop.db.clone());

        let awa = users.deactivate(&shop.cashier.id).await.unwrap();
        assert!(!awa.is_active);
        assert!(users.deactivate("missing").await.unwrap_err().is_not_found());
    }
}
