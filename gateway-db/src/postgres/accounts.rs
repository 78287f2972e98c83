use async_trait::async_trait;
use gateway_common::domain::Account;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{map_sqlx, DbError};
use crate::repository::AccountRepository;

pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ACCOUNT_COLUMNS: &str = "id, user_id, balance, currency, created_at, updated_at";

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn create_for_user(&self, user_id: Uuid, currency: &str) -> Result<Account, DbError> {
        let query = format!(
            "INSERT INTO accounts (id, user_id, balance, currency) \
             VALUES ($1, $2, 0, $3) RETURNING {ACCOUNT_COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&query)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(currency)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx(e, "account already exists for user"))
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Account>, DbError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1");
        sqlx::query_as::<_, Account>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DbError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)
    }
}

/// Locks the account row `FOR UPDATE` inside the caller's transaction and
/// returns its current balance. Used by `gateway-accounts` before checking
/// or mutating balance so the check and the later write are atomic with
/// respect to other transactions on the same row.
pub async fn lock_account_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    account_id: Uuid,
) -> Result<Decimal, DbError> {
    let row: (Decimal,) = sqlx::query_as("SELECT balance FROM accounts WHERE id = $1 FOR UPDATE")
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;
    Ok(row.0)
}

pub async fn apply_balance_delta(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    account_id: Uuid,
    delta: Decimal,
) -> Result<(), DbError> {
    sqlx::query("UPDATE accounts SET balance = balance + $2, updated_at = now() WHERE id = $1")
        .bind(account_id)
        .bind(delta)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx(e, "balance update violates constraint"))?;
    Ok(())
}
