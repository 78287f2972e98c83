mod account;
mod job;
mod transaction;
mod user;
mod webhook;

pub use account::Account;
pub use job::{FailedTask, Job, JobStatus, QueueName};
pub use transaction::{
    BankResponseStatus, Currency, Transaction, TransactionStatus, TransactionType,
};
pub use user::User;
pub use webhook::{truncate, WebhookDelivery, WebhookDeliveryStatus};

/// Header and key-prefix constants carried over unchanged from the original
/// implementation so client integrations observe the same wire contract.
pub mod headers {
    pub const IDEMPOTENCY: &str = "Idempotency-Key";
    pub const RATE_LIMIT_LIMIT: &str = "X-RateLimit-Limit";
    pub const RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";
    pub const RATE_LIMIT_RESET: &str = "X-RateLimit-Reset";
    pub const REQUEST_ID: &str = "X-Request-ID";
    pub const WEBHOOK_SIGNATURE: &str = "X-Bank-Signature";
}

pub const TOKEN_TYPE_BEARER: &str = "bearer";
