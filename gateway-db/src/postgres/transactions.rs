use async_trait::async_trait;
use gateway_common::domain::{Transaction, TransactionStatus, TransactionType};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{map_sqlx, DbError};
use crate::postgres::accounts::{apply_balance_delta, lock_account_for_update};
use crate::repository::TransactionRepository;

pub struct PgTransactionRepository {
    pool: PgPool,
}

impl PgTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const TX_COLUMNS: &str = "id, account_id, transaction_type, amount, currency, status, \
     bank_transaction_id, bank_response, error_code, error_message, idempotency_key, \
     worker_job_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    account_id: Uuid,
    transaction_type: String,
    amount: Decimal,
    currency: String,
    status: String,
    bank_transaction_id: Option<String>,
    bank_response: Option<String>,
    error_code: Option<String>,
    error_message: Option<String>,
    idempotency_key: Option<String>,
    worker_job_id: Option<Uuid>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DbError;

    fn try_from(row: TransactionRow) -> Result<Self, DbError> {
        let transaction_type = match row.transaction_type.as_str() {
            "DEPOSIT" => TransactionType::Deposit,
            "WITHDRAWAL" => TransactionType::Withdrawal,
            other => {
                return Err(DbError::Sqlx(sqlx::Error::Decode(Box::new(
                    std::io::Error::new(std::io::ErrorKind::InvalidData, format!("unknown transaction_type {other}")),
                ))))
            }
        };
        let status = parse_status(&row.status)?;
        Ok(Transaction {
            id: row.id,
            account_id: row.account_id,
            transaction_type,
            amount: row.amount,
            currency: row.currency,
            status,
            bank_transaction_id: row.bank_transaction_id,
            bank_response: row.bank_response,
            error_code: row.error_code,
            error_message: row.error_message,
            idempotency_key: row.idempotency_key,
            worker_job_id: row.worker_job_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parse_status(s: &str) -> Result<TransactionStatus, DbError> {
    Ok(match s {
        "PENDING" => TransactionStatus::Pending,
        "PROCESSING" => TransactionStatus::Processing,
        "SUCCESS" => TransactionStatus::Success,
        "FAILED" => TransactionStatus::Failed,
        "PENDING_REVIEW" => TransactionStatus::PendingReview,
        other => {
            return Err(DbError::Sqlx(sqlx::Error::Decode(Box::new(
                std::io::Error::new(std::io::ErrorKind::InvalidData, format!("unknown status {other}")),
            ))))
        }
    })
}

fn status_str(status: TransactionStatus) -> &'static str {
    match status {
        TransactionStatus::Pending => "PENDING",
        TransactionStatus::Processing => "PROCESSING",
        TransactionStatus::Success => "SUCCESS",
        TransactionStatus::Failed => "FAILED",
        TransactionStatus::PendingReview => "PENDING_REVIEW",
    }
}

#[async_trait]
impl TransactionRepository for PgTransactionRepository {
    async fn create_pending(
        &self,
        account_id: Uuid,
        transaction_type: TransactionType,
        amount: Decimal,
        currency: &str,
        idempotency_key: Option<&str>,
    ) -> Result<Transaction, DbError> {
        let query = format!(
            "INSERT INTO transactions (id, account_id, transaction_type, amount, currency, \
             status, idempotency_key) VALUES ($1, $2, $3, $4, $5, 'PENDING', $6) \
             RETURNING {TX_COLUMNS}"
        );
        let row: TransactionRow = sqlx::query_as(&query)
            .bind(Uuid::new_v4())
            .bind(account_id)
            .bind(transaction_type.as_str())
            .bind(amount)
            .bind(currency)
            .bind(idempotency_key)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx(e, "idempotency key already used"))?;
        row.try_into()
    }

    async fn create_pending_withdrawal_checked(
        &self,
        account_id: Uuid,
        amount: Decimal,
        currency: &str,
        idempotency_key: Option<&str>,
    ) -> Result<Transaction, DbError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;

        let balance = lock_account_for_update(&mut tx, account_id).await?;
        if balance < amount {
            tx.rollback().await?;
            return Err(DbError::InsufficientBalance);
        }

        let query = format!(
            "INSERT INTO transactions (id, account_id, transaction_type, amount, currency, \
             status, idempotency_key) VALUES ($1, $2, 'WITHDRAWAL', $3, $4, 'PENDING', $5) \
             RETURNING {TX_COLUMNS}"
        );
        let row: TransactionRow = sqlx::query_as(&query)
            .bind(Uuid::new_v4())
            .bind(account_id)
            .bind(amount)
            .bind(currency)
            .bind(idempotency_key)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx(e, "idempotency key already used"))?;

        tx.commit().await?;
        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>, DbError> {
        let query = format!("SELECT {TX_COLUMNS} FROM transactions WHERE id = $1");
        let row: Option<TransactionRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Transaction>, DbError> {
        let query = format!("SELECT {TX_COLUMNS} FROM transactions WHERE idempotency_key = $1");
        let row: Option<TransactionRow> = sqlx::query_as(&query)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_for_account(
        &self,
        account_id: Uuid,
        transaction_type: Option<TransactionType>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Transaction>, DbError> {
        let rows: Vec<TransactionRow> = match transaction_type {
            Some(t) => {
                let query = format!(
                    "SELECT {TX_COLUMNS} FROM transactions WHERE account_id = $1 AND transaction_type = $2 \
                     ORDER BY created_at DESC OFFSET $3 LIMIT $4"
                );
                sqlx::query_as(&query)
                    .bind(account_id)
                    .bind(t.as_str())
                    .bind(skip)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let query = format!(
                    "SELECT {TX_COLUMNS} FROM transactions WHERE account_id = $1 \
                     ORDER BY created_at DESC OFFSET $2 LIMIT $3"
                );
                sqlx::query_as(&query)
                    .bind(account_id)
                    .bind(skip)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn mark_processing(&self, id: Uuid, worker_job_id: Uuid) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE transactions SET status = 'PROCESSING', worker_job_id = $2, updated_at = now() \
             WHERE id = $1 AND status IN ('PENDING', 'PROCESSING')",
        )
        .bind(id)
        .bind(worker_job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn complete_with_balance_change(
        &self,
        id: Uuid,
        delta: Decimal,
        bank_transaction_id: &str,
        bank_response: &str,
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        let account_id: (Uuid,) = sqlx::query_as("SELECT account_id FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::NotFound)?;

        let balance = lock_account_for_update(&mut tx, account_id.0).await?;
        if balance + delta < Decimal::ZERO {
            // The worker re-checks balance under the row lock before calling this;
            // reaching here means two completions raced past that check.
            sqlx::query(
                "UPDATE transactions SET status = 'PENDING_REVIEW', \
                 error_message = 'balance check failed at completion', updated_at = now() \
                 WHERE id = $1",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            return Err(DbError::Conflict("balance would go negative".into()));
        }

        apply_balance_delta(&mut tx, account_id.0, delta).await?;

        sqlx::query(
            "UPDATE transactions SET status = 'SUCCESS', bank_transaction_id = $2, \
             bank_response = $3, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(bank_transaction_id)
        .bind(bank_response)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error_code: &str, error_message: &str) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE transactions SET status = 'FAILED', error_code = $2, error_message = $3, \
             updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(error_code)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_pending_review(&self, id: Uuid, error_message: &str) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE transactions SET status = 'PENDING_REVIEW', error_message = $2, \
             updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: TransactionStatus) -> Result<(), DbError> {
        sqlx::query("UPDATE transactions SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status_str(status))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
