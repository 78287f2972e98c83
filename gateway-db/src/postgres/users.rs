use async_trait::async_trait;
use gateway_common::domain::User;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{map_sqlx, DbError};
use crate::repository::UserRepository;

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, email, full_name, hashed_password, is_active, webhook_url, created_at, updated_at";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, email: &str, full_name: &str, hashed_password: &str) -> Result<User, DbError> {
        let query = format!(
            "INSERT INTO users (id, email, full_name, hashed_password) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(full_name)
            .bind(hashed_password)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx(e, "email already registered"))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DbError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)
    }

    async fn set_webhook_url(&self, id: Uuid, webhook_url: Option<&str>) -> Result<(), DbError> {
        sqlx::query("UPDATE users SET webhook_url = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(webhook_url)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }
}
