use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueName {
    Transactions,
    TransactionsDlq,
    Webhooks,
    WebhooksDlq,
}

impl QueueName {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::Transactions => "transactions",
            QueueName::TransactionsDlq => "transactions.dlq",
            QueueName::Webhooks => "webhooks",
            QueueName::WebhooksDlq => "webhooks.dlq",
        }
    }

    pub fn dlq_of(&self) -> Option<QueueName> {
        match self {
            QueueName::Transactions => Some(QueueName::TransactionsDlq),
            QueueName::Webhooks => Some(QueueName::WebhooksDlq),
            _ => None,
        }
    }

    pub fn main_of(&self) -> Option<QueueName> {
        match self {
            QueueName::TransactionsDlq => Some(QueueName::Transactions),
            QueueName::WebhooksDlq => Some(QueueName::Webhooks),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub queue: String,
    pub job_name: String,
    pub payload: Value,
    pub status: JobStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub available_at: DateTime<Utc>,
    pub locked_by: Option<String>,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FailedTask {
    pub id: Uuid,
    pub job_id: Uuid,
    pub job_name: String,
    pub args: Value,
    pub exception_type: String,
    pub exception_message: String,
    pub traceback: Option<String>,
    pub retry_count: Option<String>,
    pub failed_at: DateTime<Utc>,
    pub replayed_at: Option<DateTime<Utc>>,
    pub replay_status: Option<String>,
    pub replay_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
