//! Request/response body shapes for the HTTP surface.

use chrono::{DateTime, Utc};
use gateway_common::domain::{
    Account, Transaction, TransactionStatus, TransactionType, User, WebhookDelivery, WebhookDeliveryStatus,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub webhook_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserLogin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: Decimal,
    pub currency: String,
    pub account_id: Uuid,
    pub as_of: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionCreate {
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub account_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub bank_transaction_id: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Transaction> for TransactionResponse {
    fn from(t: &Transaction) -> Self {
        Self {
            id: t.id,
            account_id: t.account_id,
            amount: t.amount,
            currency: t.currency.clone(),
            transaction_type: t.transaction_type,
            status: t.status,
            bank_transaction_id: t.bank_transaction_id.clone(),
            error_code: t.error_code.clone(),
            error_message: t.error_message.clone(),
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionAcceptedResponse {
    #[serde(flatten)]
    pub transaction: TransactionResponse,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

pub const MAX_LIST_LIMIT: i64 = 100;

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookDeliveryResponse {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub webhook_url: String,
    pub status: WebhookDeliveryStatus,
    pub attempt_count: i32,
    pub max_attempts: i32,
    pub http_status_code: Option<i32>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&WebhookDelivery> for WebhookDeliveryResponse {
    fn from(d: &WebhookDelivery) -> Self {
        Self {
            id: d.id,
            transaction_id: d.transaction_id,
            webhook_url: d.webhook_url.clone(),
            status: d.status,
            attempt_count: d.attempt_count,
            max_attempts: d.max_attempts,
            http_status_code: d.http_status_code,
            response_body: d.response_body.clone(),
            error_message: d.error_message.clone(),
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookDeliveryListResponse {
    pub deliveries: Vec<WebhookDeliveryResponse>,
    pub total: usize,
}

#[allow(dead_code)]
pub fn account_response(account: &Account) -> serde_json::Value {
    serde_json::json!({
        "id": account.id,
        "user_id": account.user_id,
        "balance": account.balance,
        "currency": account.currency,
        "created_at": account.created_at,
        "updated_at": account.updated_at,
    })
}
