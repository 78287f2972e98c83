//! Drains the `webhooks` queue, invoking `WebhookDeliveryService::attempt_delivery`
//! and translating its outcome into job-queue bookkeeping: transient failures
//! are retried with backoff, permanent failures complete the job (the
//! delivery row itself already carries the terminal `FAILED` status), and
//! retry exhaustion moves the job to the webhook DLQ.

use std::time::Duration;

use gateway_common::domain::Job;
use gateway_queue::{DeadLetterService, WEBHOOK_JOB_NAME};
use gateway_webhook::{DeliveryOutcome, WebhookDeliveryService};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const RETRY_BACKOFF_BASE: Duration = Duration::from_secs(1);
const RETRY_BACKOFF_CAP: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WebhookJobPayload {
    delivery_id: Uuid,
}

pub struct WebhookConsumer {
    deliveries: WebhookDeliveryService,
    queue: gateway_queue::PgJobQueue,
    dlq: DeadLetterService,
}

impl WebhookConsumer {
    pub fn new(deliveries: WebhookDeliveryService, queue: gateway_queue::PgJobQueue, dlq: DeadLetterService) -> Self {
        Self { deliveries, queue, dlq }
    }

    pub async fn process(&self, job: &Job) {
        debug_assert_eq!(job.job_name, WEBHOOK_JOB_NAME);

        let payload: WebhookJobPayload = match serde_json::from_value(job.payload.clone()) {
            Ok(p) => p,
            Err(err) => {
                log::error!("webhook job {} has malformed payload, sending to DLQ: {err}", job.id);
                self.send_to_dlq(job, "MalformedPayload", &err.to_string()).await;
                return;
            }
        };

        match self.deliveries.attempt_delivery(payload.delivery_id).await {
            Ok(DeliveryOutcome::Success | DeliveryOutcome::PermanentFailure) => {
                if let Err(err) = self.queue.complete(job.id).await {
                    log::error!("failed to mark webhook job {} complete: {err}", job.id);
                }
            }
            Ok(DeliveryOutcome::Exhausted) => {
                log::error!("webhook job {} exhausted delivery attempts, sending to DLQ", job.id);
                self.send_to_dlq(job, "WebhookDeliveryError", "max delivery attempts exceeded").await;
            }
            Ok(DeliveryOutcome::Transient) => self.schedule_retry(job).await,
            Err(err) => {
                log::error!("webhook delivery {} errored: {err}", payload.delivery_id);
                self.schedule_retry(job).await;
            }
        }
    }

    async fn schedule_retry(&self, job: &Job) {
        if job.attempts >= job.max_attempts {
            log::error!("webhook job {} exhausted job-queue attempts, sending to DLQ", job.id);
            self.send_to_dlq(job, "WebhookDeliveryError", "max delivery attempts exceeded").await;
            return;
        }

        let delay = gateway_cache::lock::jittered_backoff(RETRY_BACKOFF_BASE, job.attempts as u32, RETRY_BACKOFF_CAP);
        let chrono_delay = chrono::Duration::milliseconds(delay.as_millis() as i64);
        if let Err(err) = self.queue.retry_later(job.id, chrono_delay).await {
            log::error!("failed to reschedule webhook job {}: {err}", job.id);
        }
    }

    async fn send_to_dlq(&self, job: &Job, exception_type: &str, exception_message: &str) {
        let retry_count = format!("{}/{}", job.attempts, job.max_attempts);
        if let Err(err) = self.dlq.record_failure(job, exception_type, exception_message, None, &retry_count).await {
            log::error!("failed to move webhook job {} to DLQ: {err}", job.id);
        }
    }
}
