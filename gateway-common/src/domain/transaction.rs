use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
        }
    }
}

/// PENDING -> PROCESSING -> {SUCCESS | FAILED | PENDING_REVIEW}. PENDING_REVIEW
/// is terminal: a human must act, the worker never re-derives it automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Success,
    Failed,
    PendingReview,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Success | TransactionStatus::Failed | TransactionStatus::PendingReview
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        "USD"
    }
}

/// Outcome reported by the (simulated) bank for a single processing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BankResponseStatus {
    Success,
    Failed,
    Timeout,
    InsufficientFunds,
    Unavailable,
}

impl BankResponseStatus {
    /// Transient statuses retry the job; `Timeout`/`Unavailable` also count
    /// as a circuit breaker failure. `Failed`/`InsufficientFunds` are
    /// permanent outcomes for this attempt and never trip the breaker.
    pub fn is_transient(&self) -> bool {
        matches!(self, BankResponseStatus::Timeout | BankResponseStatus::Unavailable)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub currency: String,
    pub status: TransactionStatus,
    pub bank_transaction_id: Option<String>,
    pub bank_response: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub idempotency_key: Option<String>,
    pub worker_job_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
