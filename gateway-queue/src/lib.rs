pub mod dlq;
pub mod error;
pub mod job_queue;

pub use dlq::DeadLetterService;
pub use error::QueueError;
pub use job_queue::{PgJobQueue, DLQ_MAX_LENGTH, DLQ_TTL};

/// `job_name` values shared between producers (`gateway-api`'s handlers,
/// `gateway-webhook`'s delivery service) and the consumers in
/// `gateway-worker` that claim jobs off these queues.
pub const TRANSACTION_JOB_NAME: &str = "process_transaction";
pub const WEBHOOK_JOB_NAME: &str = "send_webhook_notification";
