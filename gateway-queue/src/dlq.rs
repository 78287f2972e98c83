use std::sync::Arc;

use gateway_common::domain::{FailedTask, Job};
use gateway_db::FailedTaskRepository;

use crate::error::QueueError;
use crate::job_queue::PgJobQueue;

/// After a job's retries are exhausted, the worker moves it onto its
/// `.dlq` queue (`PgJobQueue::move_to_dlq`) and persists a `FailedTask`
/// row for operator-facing inspection: the `jobs` row itself *is* the DLQ
/// entry, with a `failed_tasks` row alongside it carrying the failure
/// detail.
#[derive(Clone)]
pub struct DeadLetterService {
    queue: PgJobQueue,
    failed_tasks: Arc<dyn FailedTaskRepository>,
}

impl DeadLetterService {
    pub fn new(queue: PgJobQueue, failed_tasks: Arc<dyn FailedTaskRepository>) -> Self {
        Self { queue, failed_tasks }
    }

    pub async fn record_failure(
        &self,
        job: &Job,
        exception_type: &str,
        exception_message: &str,
        traceback: Option<&str>,
        retry_count: &str,
    ) -> Result<(Job, FailedTask), QueueError> {
        let dlq_job = self.queue.move_to_dlq(job).await?;
        let failed_task = self
            .failed_tasks
            .create(
                job.id,
                &job.job_name,
                job.payload.clone(),
                exception_type,
                exception_message,
                traceback,
                Some(retry_count),
            )
            .await?;
        Ok((dlq_job, failed_task))
    }

    /// Re-enqueues the DLQ job (identified by its original job id) onto
    /// the main queue and stamps the `failed_tasks` row with the outcome,
    /// rejecting double-replay by checking `replayed_at` first.
    pub async fn replay(&self, original_job_id: uuid::Uuid) -> Result<Job, QueueError> {
        let failed_task = self
            .failed_tasks
            .find_by_job_id(original_job_id)
            .await?
            .ok_or(QueueError::NotFound)?;
        if failed_task.replayed_at.is_some() {
            return Err(QueueError::AlreadyReplayed);
        }

        let dlq_job = self.queue.find(original_job_id).await?.ok_or(QueueError::NotFound)?;
        let new_job = self.queue.requeue_on_main(&dlq_job).await?;
        let notes = format!("replayed as job {}", new_job.id);
        self.failed_tasks
            .mark_replayed(failed_task.id, "QUEUED", &notes)
            .await?;
        Ok(new_job)
    }
}
