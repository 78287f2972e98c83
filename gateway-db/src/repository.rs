use async_trait::async_trait;
use gateway_common::domain::{Account, FailedTask, Transaction, TransactionStatus, User, WebhookDelivery, WebhookDeliveryStatus};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::DbError;

/// Narrow, operation-shaped ports per aggregate rather than one generic
/// repository base — mirrors the pack's hexagonal transaction-service port.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, email: &str, full_name: &str, hashed_password: &str) -> Result<User, DbError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DbError>;
    async fn set_webhook_url(&self, id: Uuid, webhook_url: Option<&str>) -> Result<(), DbError>;
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn create_for_user(&self, user_id: Uuid, currency: &str) -> Result<Account, DbError>;
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Account>, DbError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DbError>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn create_pending(
        &self,
        account_id: Uuid,
        transaction_type: gateway_common::domain::TransactionType,
        amount: Decimal,
        currency: &str,
        idempotency_key: Option<&str>,
    ) -> Result<Transaction, DbError>;

    /// Opens a REPEATABLE READ transaction, locks the account row `FOR
    /// UPDATE`, and aborts with `DbError::InsufficientBalance` if
    /// `balance < amount` — without debiting. The row survives; the
    /// withdrawal is only charged on completion.
    async fn create_pending_withdrawal_checked(
        &self,
        account_id: Uuid,
        amount: Decimal,
        currency: &str,
        idempotency_key: Option<&str>,
    ) -> Result<Transaction, DbError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>, DbError>;
    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Transaction>, DbError>;

    /// `transaction_type` narrows the listing to one leg (deposits or
    /// withdrawals) when `Some`; `None` lists both, as `/users/me/transactions` does.
    async fn list_for_account(
        &self,
        account_id: Uuid,
        transaction_type: Option<gateway_common::domain::TransactionType>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Transaction>, DbError>;

    async fn mark_processing(&self, id: Uuid, worker_job_id: Uuid) -> Result<(), DbError>;

    /// Locks the owning account row (`FOR UPDATE`) and, within the same
    /// transaction, applies `delta` to its balance and marks the
    /// transaction `SUCCESS` with the bank's reference id. `delta` is
    /// negative for a withdrawal, positive for a deposit.
    async fn complete_with_balance_change(
        &self,
        id: Uuid,
        delta: Decimal,
        bank_transaction_id: &str,
        bank_response: &str,
    ) -> Result<(), DbError>;

    async fn mark_failed(&self, id: Uuid, error_code: &str, error_message: &str) -> Result<(), DbError>;
    async fn mark_pending_review(&self, id: Uuid, error_message: &str) -> Result<(), DbError>;
    async fn set_status(&self, id: Uuid, status: TransactionStatus) -> Result<(), DbError>;
}

#[async_trait]
pub trait WebhookRepository: Send + Sync {
    async fn create(
        &self,
        transaction_id: Uuid,
        webhook_url: &str,
        payload: serde_json::Value,
        max_attempts: i32,
    ) -> Result<WebhookDelivery, DbError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WebhookDelivery>, DbError>;
    async fn list_for_transaction(&self, transaction_id: Uuid) -> Result<Vec<WebhookDelivery>, DbError>;
    async fn list_all(&self, skip: i64, limit: i64) -> Result<Vec<WebhookDelivery>, DbError>;

    /// Increments `attempt_count` and sets `status` — called once per
    /// delivery attempt, before the outbound POST, mirroring the
    /// original's "increment then commit" at task start.
    async fn record_attempt(
        &self,
        id: Uuid,
        status: WebhookDeliveryStatus,
        http_status_code: Option<i32>,
        response_body: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), DbError>;

    /// Sets the terminal/interim outcome of an already-recorded attempt
    /// without incrementing `attempt_count` again.
    async fn finalize_attempt(
        &self,
        id: Uuid,
        status: WebhookDeliveryStatus,
        http_status_code: Option<i32>,
        response_body: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), DbError>;
}

#[async_trait]
pub trait FailedTaskRepository: Send + Sync {
    async fn find_by_job_id(&self, job_id: Uuid) -> Result<Option<FailedTask>, DbError>;

    async fn create(
        &self,
        job_id: Uuid,
        job_name: &str,
        args: serde_json::Value,
        exception_type: &str,
        exception_message: &str,
        traceback: Option<&str>,
        retry_count: Option<&str>,
    ) -> Result<FailedTask, DbError>;

    async fn mark_replayed(&self, id: Uuid, replay_status: &str, replay_notes: &str) -> Result<(), DbError>;

    async fn stats(&self) -> Result<FailedTaskStats, DbError>;
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FailedTaskStats {
    pub total: i64,
    pub recent_24h: i64,
    pub unreplayed: i64,
}
