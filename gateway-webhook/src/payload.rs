//! Outbound notification payload and the inbound bank callback body it's
//! paired with.

use gateway_common::domain::{Account, BankResponseStatus, Transaction, TransactionStatus, TransactionType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /webhooks/bank-callback`. Deserialized from the same raw
/// bytes the signature was verified over — never a reserialized form.
#[derive(Debug, Clone, Deserialize)]
pub struct BankCallbackPayload {
    pub transaction_id: Uuid,
    pub bank_transaction_id: Option<String>,
    pub status: BankResponseStatus,
    pub message: Option<String>,
    pub error_code: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionEventPayload {
    pub event: &'static str,
    pub transaction: TransactionSnapshot,
    pub account: AccountSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionSnapshot {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: String,
    pub currency: String,
    pub status: TransactionStatus,
    pub bank_transaction_id: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountSnapshot {
    pub id: Uuid,
    pub balance: String,
}

impl TransactionEventPayload {
    /// Terminal status determines the event name; callers only build this
    /// for SUCCESS/FAILED/PENDING_REVIEW transitions.
    pub fn for_transaction(transaction: &Transaction, account: &Account) -> Self {
        let event = match transaction.status {
            TransactionStatus::Success => "transaction.completed",
            _ => "transaction.failed",
        };
        Self {
            event,
            transaction: TransactionSnapshot {
                id: transaction.id,
                transaction_type: transaction.transaction_type,
                amount: transaction.amount.to_string(),
                currency: transaction.currency.clone(),
                status: transaction.status,
                bank_transaction_id: transaction.bank_transaction_id.clone(),
                error_code: transaction.error_code.clone(),
                error_message: transaction.error_message.clone(),
                created_at: transaction.created_at,
                updated_at: transaction.updated_at,
            },
            account: AccountSnapshot {
                id: account.id,
                balance: account.balance.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn sample_transaction(status: TransactionStatus) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            transaction_type: TransactionType::Deposit,
            amount: Decimal::new(10000, 2),
            currency: "USD".to_string(),
            status,
            bank_transaction_id: Some("BANK-DEP-1".to_string()),
            bank_response: None,
            error_code: None,
            error_message: None,
            idempotency_key: None,
            worker_job_id: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn sample_account() -> Account {
        Account {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            balance: Decimal::new(10000, 2),
            currency: "USD".to_string(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn success_maps_to_completed_event() {
        let payload = TransactionEventPayload::for_transaction(&sample_transaction(TransactionStatus::Success), &sample_account());
        assert_eq!(payload.event, "transaction.completed");
    }

    #[test]
    fn failed_maps_to_failed_event() {
        let payload = TransactionEventPayload::for_transaction(&sample_transaction(TransactionStatus::Failed), &sample_account());
        assert_eq!(payload.event, "transaction.failed");
    }

    #[test]
    fn pending_review_maps_to_failed_event() {
        let payload =
            TransactionEventPayload::for_transaction(&sample_transaction(TransactionStatus::PendingReview), &sample_account());
        assert_eq!(payload.event, "transaction.failed");
    }
}
