use std::sync::Arc;
use std::time::Duration;

use gateway_common::domain::{Account, QueueName, Transaction, WebhookDeliveryStatus};
use gateway_db::WebhookRepository;
use gateway_queue::{PgJobQueue, WEBHOOK_JOB_NAME};
use reqwest::Client;
use serde_json::json;
use uuid::Uuid;

use crate::error::WebhookError;
use crate::payload::TransactionEventPayload;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);
const RESPONSE_BODY_TRUNCATE_BYTES: usize = 1000;

/// Truncates a header/body value to the webhook_deliveries storage limit.
fn truncate(text: &str) -> String {
    gateway_common::domain::truncate(text, RESPONSE_BODY_TRUNCATE_BYTES)
}

/// Outcome of one delivery attempt, distinguishing retryable failures from
/// the terminal ones so the caller (worker job loop) knows whether to
/// requeue or move on to the DLQ. `PermanentFailure` is a definitive
/// rejection (a non-retryable HTTP status) that need never be retried;
/// `Exhausted` is a retryable failure (transport error, 5xx, 408, 429)
/// that has used up its last attempt — both land the delivery row in
/// `FAILED`, but only `Exhausted` should also dead-letter the job, since
/// `PermanentFailure` was never going to succeed on a retry in the first
/// place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Success,
    PermanentFailure,
    Exhausted,
    Transient,
}

/// Queues and sends outbound webhook notifications on every terminal
/// transaction transition.
#[derive(Clone)]
pub struct WebhookDeliveryService {
    webhooks: Arc<dyn WebhookRepository>,
    queue: PgJobQueue,
    http: Client,
}

impl WebhookDeliveryService {
    pub fn new(webhooks: Arc<dyn WebhookRepository>, queue: PgJobQueue) -> Self {
        let http = Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .expect("reqwest client builds with a fixed timeout");
        Self { webhooks, queue, http }
    }

    /// Inserts the `webhook_deliveries` row and enqueues the delivery job,
    /// called on every terminal transition when the owning user has a
    /// webhook URL configured.
    pub async fn enqueue_for_transaction(
        &self,
        transaction: &Transaction,
        account: &Account,
        webhook_url: &str,
        max_attempts: i32,
    ) -> Result<Uuid, WebhookError> {
        let payload = TransactionEventPayload::for_transaction(transaction, account);
        let payload_json = serde_json::to_value(&payload).expect("TransactionEventPayload always serializes");
        let delivery = self
            .webhooks
            .create(transaction.id, webhook_url, payload_json, max_attempts)
            .await?;
        self.queue
            .enqueue(QueueName::Webhooks, WEBHOOK_JOB_NAME, json!({ "delivery_id": delivery.id }), max_attempts)
            .await?;
        Ok(delivery.id)
    }

    /// Drives one delivery attempt: fetch, mark SENDING (incrementing
    /// `attempt_count`), POST, classify, and persist the outcome.
    /// Duplicate delivery of an already-terminal row is idempotent: it
    /// reports the stored outcome without sending again.
    pub async fn attempt_delivery(&self, delivery_id: Uuid) -> Result<DeliveryOutcome, WebhookError> {
        let delivery = self
            .webhooks
            .find_by_id(delivery_id)
            .await?
            .ok_or(WebhookError::DeliveryNotFound)?;

        match delivery.status {
            WebhookDeliveryStatus::Success => return Ok(DeliveryOutcome::Success),
            WebhookDeliveryStatus::Failed => return Ok(DeliveryOutcome::PermanentFailure),
            WebhookDeliveryStatus::Pending | WebhookDeliveryStatus::Sending => {}
        }

        self.webhooks
            .record_attempt(delivery_id, WebhookDeliveryStatus::Sending, None, None, None)
            .await?;
        let attempt_number = delivery.attempt_count + 1;

        log::info!(
            "webhook_sending delivery_id={delivery_id} attempt={attempt_number} max_attempts={} url={}",
            delivery.max_attempts,
            delivery.webhook_url
        );

        let send_result = self
            .http
            .post(&delivery.webhook_url)
            .header("Content-Type", "application/json")
            .header("User-Agent", "PaymentGateway-Webhook/1.0")
            .header("X-Webhook-Delivery-ID", delivery_id.to_string())
            .body(delivery.payload.to_string())
            .send()
            .await;

        let response = match send_result {
            Ok(response) => response,
            Err(err) => {
                let exhausted = attempt_number >= delivery.max_attempts;
                let status = if exhausted {
                    WebhookDeliveryStatus::Failed
                } else {
                    WebhookDeliveryStatus::Pending
                };
                self.webhooks
                    .finalize_attempt(delivery_id, status, None, None, Some(&truncate(&err.to_string())))
                    .await?;
                if exhausted {
                    log::error!("webhook_delivery_failed_max_retries delivery_id={delivery_id}");
                } else {
                    log::warn!("webhook_delivery_error_will_retry delivery_id={delivery_id} error={err}");
                }
                return Ok(if exhausted { DeliveryOutcome::Exhausted } else { DeliveryOutcome::Transient });
            }
        };

        let http_status = response.status();
        let body_text = response.text().await.unwrap_or_default();
        let truncated_body = truncate(&body_text);

        if http_status.is_success() {
            self.webhooks
                .finalize_attempt(delivery_id, WebhookDeliveryStatus::Success, Some(http_status.as_u16() as i32), Some(&truncated_body), None)
                .await?;
            log::info!("webhook_delivered_successfully delivery_id={delivery_id} status_code={http_status}");
            return Ok(DeliveryOutcome::Success);
        }

        let retryable = http_status.is_server_error() || http_status.as_u16() == 408 || http_status.as_u16() == 429;
        if !retryable {
            let error_message = format!("HTTP {http_status}: {truncated_body}");
            self.webhooks
                .finalize_attempt(
                    delivery_id,
                    WebhookDeliveryStatus::Failed,
                    Some(http_status.as_u16() as i32),
                    Some(&truncated_body),
                    Some(&truncate(&error_message)),
                )
                .await?;
            log::warn!("webhook_permanent_failure delivery_id={delivery_id} status_code={http_status}");
            return Ok(DeliveryOutcome::PermanentFailure);
        }

        let exhausted = attempt_number >= delivery.max_attempts;
        let status = if exhausted { WebhookDeliveryStatus::Failed } else { WebhookDeliveryStatus::Pending };
        let error_message = format!("HTTP {http_status}: {truncated_body}");
        self.webhooks
            .finalize_attempt(delivery_id, status, Some(http_status.as_u16() as i32), Some(&truncated_body), Some(&truncate(&error_message)))
            .await?;
        if exhausted {
            log::error!("webhook_delivery_failed_max_retries delivery_id={delivery_id}");
            Ok(DeliveryOutcome::Exhausted)
        } else {
            Ok(DeliveryOutcome::Transient)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_common::domain::WebhookDelivery;
    use async_trait::async_trait;
    use gateway_db::DbError;
    use serde_json::Value;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FakeWebhookRepo {
        delivery: Mutex<WebhookDelivery>,
    }

    #[async_trait]
    impl WebhookRepository for FakeWebhookRepo {
        async fn create(&self, _t: Uuid, _u: &str, _p: Value, _m: i32) -> Result<WebhookDelivery, DbError> {
            unimplemented!()
        }
        async fn find_by_id(&self, _id: Uuid) -> Result<Option<WebhookDelivery>, DbError> {
            Ok(Some(self.delivery.lock().unwrap().clone()))
        }
        async fn list_for_transaction(&self, _id: Uuid) -> Result<Vec<WebhookDelivery>, DbError> {
            unimplemented!()
        }
        async fn list_all(&self, _s: i64, _l: i64) -> Result<Vec<WebhookDelivery>, DbError> {
            unimplemented!()
        }
        async fn record_attempt(
            &self,
            _id: Uuid,
            status: WebhookDeliveryStatus,
            _h: Option<i32>,
            _b: Option<&str>,
            _e: Option<&str>,
        ) -> Result<(), DbError> {
            let mut d = self.delivery.lock().unwrap();
            d.status = status;
            d.attempt_count += 1;
            Ok(())
        }
        async fn finalize_attempt(
            &self,
            _id: Uuid,
            status: WebhookDeliveryStatus,
            http_status_code: Option<i32>,
            response_body: Option<&str>,
            error_message: Option<&str>,
        ) -> Result<(), DbError> {
            let mut d = self.delivery.lock().unwrap();
            d.status = status;
            d.http_status_code = http_status_code;
            d.response_body = response_body.map(String::from);
            d.error_message = error_message.map(String::from);
            Ok(())
        }
    }

    fn sample_delivery(url: String) -> WebhookDelivery {
        WebhookDelivery {
            id: Uuid::new_v4(),
            transaction_id: Uuid::new_v4(),
            webhook_url: url,
            status: WebhookDeliveryStatus::Pending,
            attempt_count: 0,
            max_attempts: 5,
            http_status_code: None,
            response_body: None,
            error_message: None,
            payload: serde_json::json!({"event": "transaction.completed"}),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn success_response_marks_delivery_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let repo = Arc::new(FakeWebhookRepo {
            delivery: Mutex::new(sample_delivery(format!("{}/hook", server.uri()))),
        });
        let pool = sqlx::PgPool::connect_lazy("postgres://invalid/invalid").unwrap();
        let queue = PgJobQueue::new(pool);
        let service = WebhookDeliveryService::new(repo.clone(), queue);

        let delivery_id = repo.delivery.lock().unwrap().id;
        let outcome = service.attempt_delivery(delivery_id).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::Success);
        assert_eq!(repo.delivery.lock().unwrap().status, WebhookDeliveryStatus::Success);
    }

    #[tokio::test]
    async fn client_error_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;

        let repo = Arc::new(FakeWebhookRepo {
            delivery: Mutex::new(sample_delivery(format!("{}/hook", server.uri()))),
        });
        let pool = sqlx::PgPool::connect_lazy("postgres://invalid/invalid").unwrap();
        let queue = PgJobQueue::new(pool);
        let service = WebhookDeliveryService::new(repo.clone(), queue);

        let delivery_id = repo.delivery.lock().unwrap().id;
        let outcome = service.attempt_delivery(delivery_id).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::PermanentFailure);
    }

    #[tokio::test]
    async fn server_error_is_transient_before_exhaustion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let mut delivery = sample_delivery(format!("{}/hook", server.uri()));
        delivery.max_attempts = 5;
        let repo = Arc::new(FakeWebhookRepo { delivery: Mutex::new(delivery) });
        let pool = sqlx::PgPool::connect_lazy("postgres://invalid/invalid").unwrap();
        let queue = PgJobQueue::new(pool);
        let service = WebhookDeliveryService::new(repo.clone(), queue);

        let delivery_id = repo.delivery.lock().unwrap().id;
        let outcome = service.attempt_delivery(delivery_id).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::Transient);
    }

    #[tokio::test]
    async fn server_error_is_exhausted_on_last_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let mut delivery = sample_delivery(format!("{}/hook", server.uri()));
        delivery.max_attempts = 3;
        delivery.attempt_count = 2;
        let repo = Arc::new(FakeWebhookRepo { delivery: Mutex::new(delivery) });
        let pool = sqlx::PgPool::connect_lazy("postgres://invalid/invalid").unwrap();
        let queue = PgJobQueue::new(pool);
        let service = WebhookDeliveryService::new(repo.clone(), queue);

        let delivery_id = repo.delivery.lock().unwrap().id;
        let outcome = service.attempt_delivery(delivery_id).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::Exhausted);
        assert_eq!(repo.delivery.lock().unwrap().status, WebhookDeliveryStatus::Failed);
    }

    #[tokio::test]
    async fn already_terminal_delivery_is_idempotent() {
        let mut delivery = sample_delivery("http://unused.invalid/hook".to_string());
        delivery.status = WebhookDeliveryStatus::Success;
        let repo = Arc::new(FakeWebhookRepo { delivery: Mutex::new(delivery) });
        let pool = sqlx::PgPool::connect_lazy("postgres://invalid/invalid").unwrap();
        let queue = PgJobQueue::new(pool);
        let service = WebhookDeliveryService::new(repo.clone(), queue);

        let delivery_id = repo.delivery.lock().unwrap().id;
        let outcome = service.attempt_delivery(delivery_id).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::Success);
    }
}
