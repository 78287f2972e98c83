use async_trait::async_trait;
use gateway_common::domain::{WebhookDelivery, WebhookDeliveryStatus};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::WebhookRepository;

pub struct PgWebhookRepository {
    pool: PgPool,
}

impl PgWebhookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const WEBHOOK_COLUMNS: &str = "id, transaction_id, webhook_url, status, attempt_count, \
     max_attempts, http_status_code, response_body, error_message, payload, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct WebhookRow {
    id: Uuid,
    transaction_id: Uuid,
    webhook_url: String,
    status: String,
    attempt_count: i32,
    max_attempts: i32,
    http_status_code: Option<i32>,
    response_body: Option<String>,
    error_message: Option<String>,
    payload: Value,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<WebhookRow> for WebhookDelivery {
    fn from(row: WebhookRow) -> Self {
        let status = match row.status.as_str() {
            "PENDING" => WebhookDeliveryStatus::Pending,
            "SENDING" => WebhookDeliveryStatus::Sending,
            "SUCCESS" => WebhookDeliveryStatus::Success,
            _ => WebhookDeliveryStatus::Failed,
        };
        WebhookDelivery {
            id: row.id,
            transaction_id: row.transaction_id,
            webhook_url: row.webhook_url,
            status,
            attempt_count: row.attempt_count,
            max_attempts: row.max_attempts,
            http_status_code: row.http_status_code,
            response_body: row.response_body,
            error_message: row.error_message,
            payload: row.payload,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn status_str(status: WebhookDeliveryStatus) -> &'static str {
    match status {
        WebhookDeliveryStatus::Pending => "PENDING",
        WebhookDeliveryStatus::Sending => "SENDING",
        WebhookDeliveryStatus::Success => "SUCCESS",
        WebhookDeliveryStatus::Failed => "FAILED",
    }
}

#[async_trait]
impl WebhookRepository for PgWebhookRepository {
    async fn create(
        &self,
        transaction_id: Uuid,
        webhook_url: &str,
        payload: Value,
        max_attempts: i32,
    ) -> Result<WebhookDelivery, DbError> {
        let query = format!(
            "INSERT INTO webhook_deliveries (id, transaction_id, webhook_url, status, \
             max_attempts, payload) VALUES ($1, $2, $3, 'PENDING', $4, $5) \
             RETURNING {WEBHOOK_COLUMNS}"
        );
        let row: WebhookRow = sqlx::query_as(&query)
            .bind(Uuid::new_v4())
            .bind(transaction_id)
            .bind(webhook_url)
            .bind(max_attempts)
            .bind(payload)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WebhookDelivery>, DbError> {
        let query = format!("SELECT {WEBHOOK_COLUMNS} FROM webhook_deliveries WHERE id = $1");
        let row: Option<WebhookRow> = sqlx::query_as(&query).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(Into::into))
    }

    async fn list_for_transaction(&self, transaction_id: Uuid) -> Result<Vec<WebhookDelivery>, DbError> {
        let query = format!(
            "SELECT {WEBHOOK_COLUMNS} FROM webhook_deliveries WHERE transaction_id = $1 \
             ORDER BY created_at"
        );
        let rows: Vec<WebhookRow> = sqlx::query_as(&query)
            .bind(transaction_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_all(&self, skip: i64, limit: i64) -> Result<Vec<WebhookDelivery>, DbError> {
        let query = format!(
            "SELECT {WEBHOOK_COLUMNS} FROM webhook_deliveries ORDER BY created_at DESC \
             OFFSET $1 LIMIT $2"
        );
        let rows: Vec<WebhookRow> = sqlx::query_as(&query)
            .bind(skip)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn record_attempt(
        &self,
        id: Uuid,
        status: WebhookDeliveryStatus,
        http_status_code: Option<i32>,
        response_body: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE webhook_deliveries SET status = $2, attempt_count = attempt_count + 1, \
             http_status_code = $3, response_body = $4, error_message = $5, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status_str(status))
        .bind(http_status_code)
        .bind(response_body)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn finalize_attempt(
        &self,
        id: Uuid,
        status: WebhookDeliveryStatus,
        http_status_code: Option<i32>,
        response_body: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE webhook_deliveries SET status = $2, http_status_code = $3, response_body = $4, \
             error_message = $5, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(status_str(status))
        .bind(http_status_code)
        .bind(response_body)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
