//! # User Repository
//!
//! Back-office accounts. Usernames are unique.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use ndayane_core::User;

const USER_COLUMNS: &str = "id, username, full_name, role, is_active, created_at";

#[derive(Debug, Clone, Copy, Default)]
pub struct UserRepository;

impl UserRepository {
    pub async fn insert(&self, conn: &mut SqliteConnection, user: &User) -> DbResult<()> {
        debug!(id = %user.id, username = %user.username, "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (id, username, full_name, role, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(user)
    }

    pub async fn get_by_username(
        &self,
        conn: &mut SqliteConnection,
        username: &str,
    ) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(user)
    }

    pub async fn list(&self, conn: &mut SqliteConnection) -> DbResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY username");
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(&mut *conn).await?;

        Ok(users)
    }

    pub async fn set_active(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        active: bool,
    ) -> DbResult<bool> {
        debug!(id = %id, active, "Setting user active flag");

        let result = sqlx::query("UPDATE users SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::test_support;
    use ndayane_core::UserRole;

    #[tokio::test]
    async fn test_username_is_unique() {
        let db = test_support::db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let repo = db.users();

        let awa = test_support::cashier("awa");
        repo.insert(&mut conn, &awa).await.unwrap();

        let err = repo
            .insert(&mut conn, &test_support::cashier("awa"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let loaded = repo.get_by_username(&mut conn, "awa").await.unwrap().unwrap();
        assert_eq!(loaded.id, awa.id);
        assert_eq!(loaded.role, UserRole::Cashier);
    }

    #[tokio::test]
    async fn test_deactivate() {
        let db = test_support::db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let repo = db.users();

        let awa = test_support::cashier("awa");
        repo.insert(&mut conn, &awa).await.unwrap();
        assert!(repo.set_active(&mut conn, &awa.id, false).await.unwrap());
        assert!(!repo.get_by_id(&mut conn, &awa.id).await.unwrap().unwrap().is_active);
        assert_eq!(repo.list(&mut conn).await.unwrap().len(), 1);
    }
}
