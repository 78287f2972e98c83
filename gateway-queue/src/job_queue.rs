use chrono::{DateTime, Duration as ChronoDuration, Utc};
use gateway_common::domain::{Job, JobStatus, QueueName};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::QueueError;

/// Bounds DLQ growth the way a `x-message-ttl=24h` / `x-max-length=10000`
/// pair would on a message broker — enforced here by a periodic reaper
/// since Postgres tables have no native TTL.
pub const DLQ_TTL: ChronoDuration = ChronoDuration::hours(24);
pub const DLQ_MAX_LENGTH: i64 = 10_000;

const JOB_COLUMNS: &str = "id, queue, job_name, payload, status, attempts, max_attempts, \
     available_at, locked_by, locked_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    queue: String,
    job_name: String,
    payload: Value,
    status: String,
    attempts: i32,
    max_attempts: i32,
    available_at: DateTime<Utc>,
    locked_by: Option<String>,
    locked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        let status = match row.status.as_str() {
            "QUEUED" => JobStatus::Queued,
            "RUNNING" => JobStatus::Running,
            "DONE" => JobStatus::Done,
            _ => JobStatus::Failed,
        };
        Job {
            id: row.id,
            queue: row.queue,
            job_name: row.job_name,
            payload: row.payload,
            status,
            attempts: row.attempts,
            max_attempts: row.max_attempts,
            available_at: row.available_at,
            locked_by: row.locked_by,
            locked_at: row.locked_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Postgres-backed job transport: `SELECT ... FOR UPDATE SKIP LOCKED` at
/// `prefetch = 1` per call stands in for a broker, following the general
/// `FOR UPDATE SKIP LOCKED` worker-queue pattern rather than pulling in a
/// message-broker dependency.
#[derive(Clone)]
pub struct PgJobQueue {
    pool: PgPool,
}

impl PgJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn enqueue(
        &self,
        queue: QueueName,
        job_name: &str,
        payload: Value,
        max_attempts: i32,
    ) -> Result<Job, QueueError> {
        let query = format!(
            "INSERT INTO jobs (id, queue, job_name, payload, status, max_attempts) \
             VALUES ($1, $2, $3, $4, 'QUEUED', $5) RETURNING {JOB_COLUMNS}"
        );
        let row: JobRow = sqlx::query_as(&query)
            .bind(Uuid::new_v4())
            .bind(queue.as_str())
            .bind(job_name)
            .bind(payload)
            .bind(max_attempts)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    /// Claims the oldest available job on `queue`, late-acked: the row
    /// stays `RUNNING` until the caller calls `complete`/`retry_later`/
    /// `move_to_dlq`, so a worker crash between claim and ack leaves it
    /// `RUNNING` for `reap_stuck` to requeue, giving at-least-once
    /// delivery.
    pub async fn claim_next(&self, queue: QueueName, worker_id: &str) -> Result<Option<Job>, QueueError> {
        let mut tx = self.pool.begin().await?;
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE queue = $1 AND status = 'QUEUED' \
             AND available_at <= now() ORDER BY available_at LIMIT 1 FOR UPDATE SKIP LOCKED"
        );
        let row: Option<JobRow> = sqlx::query_as(&query)
            .bind(queue.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        sqlx::query(
            "UPDATE jobs SET status = 'RUNNING', locked_by = $2, locked_at = now(), \
             attempts = attempts + 1, updated_at = now() WHERE id = $1",
        )
        .bind(row.id)
        .bind(worker_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.find(row.id).await
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Job>, QueueError> {
        let query = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        let row: Option<JobRow> = sqlx::query_as(&query).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(Into::into))
    }

    pub async fn complete(&self, id: Uuid) -> Result<(), QueueError> {
        sqlx::query(
            "UPDATE jobs SET status = 'DONE', locked_by = NULL, locked_at = NULL, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Re-queues after a transient failure, scheduling `available_at` for
    /// `delay` from now — the caller supplies `delay` (typically
    /// `gateway_cache::lock::jittered_backoff`).
    pub async fn retry_later(&self, id: Uuid, delay: chrono::Duration) -> Result<(), QueueError> {
        sqlx::query(
            "UPDATE jobs SET status = 'QUEUED', locked_by = NULL, locked_at = NULL, \
             available_at = now() + make_interval(secs => $2), updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(delay.num_milliseconds() as f64 / 1000.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Moves the job onto its `.dlq` queue in place — same row, same id,
    /// so a `failed_tasks` row keyed on this job's id can find it again
    /// at replay time.
    pub async fn move_to_dlq(&self, job: &Job) -> Result<Job, QueueError> {
        let Some(dlq) = parse_queue_name(&job.queue).dlq_of() else {
            return Err(QueueError::NotFound);
        };
        let query = format!(
            "UPDATE jobs SET queue = $2, status = 'QUEUED', locked_by = NULL, locked_at = NULL, \
             updated_at = now() WHERE id = $1 RETURNING {JOB_COLUMNS}"
        );
        let row: JobRow = sqlx::query_as(&query).bind(job.id).bind(dlq.as_str()).fetch_one(&self.pool).await?;
        Ok(row.into())
    }

    /// Moves a DLQ row back onto its original main queue, in place,
    /// resetting attempts so the worker's retry budget starts fresh.
    pub async fn requeue_on_main(&self, dlq_job: &Job) -> Result<Job, QueueError> {
        let Some(main) = parse_queue_name(&dlq_job.queue).main_of() else {
            return Err(QueueError::NotFound);
        };
        let query = format!(
            "UPDATE jobs SET queue = $2, status = 'QUEUED', attempts = 0, available_at = now(), \
             locked_by = NULL, locked_at = NULL, updated_at = now() WHERE id = $1 RETURNING {JOB_COLUMNS}"
        );
        let row: JobRow = sqlx::query_as(&query)
            .bind(dlq_job.id)
            .bind(main.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    /// Requeues a job stuck `RUNNING` past `stale_after` (crashed worker,
    /// lease expired) back onto its own queue. Returns how many rows were
    /// reclaimed.
    pub async fn reap_stuck(&self, stale_after: chrono::Duration) -> Result<u64, QueueError> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'QUEUED', locked_by = NULL, locked_at = NULL, updated_at = now() \
             WHERE status = 'RUNNING' AND locked_at < now() - make_interval(secs => $1)",
        )
        .bind(stale_after.num_milliseconds() as f64 / 1000.0)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Deletes `DONE`/`FAILED` rows older than `DLQ_TTL` and trims each
    /// queue to its newest `DLQ_MAX_LENGTH` rows.
    pub async fn reap_expired(&self) -> Result<u64, QueueError> {
        let result = sqlx::query(
            "DELETE FROM jobs WHERE status IN ('DONE', 'FAILED') \
             AND updated_at < now() - make_interval(secs => $1)",
        )
        .bind(DLQ_TTL.num_seconds() as f64)
        .execute(&self.pool)
        .await?;

        for queue in [
            QueueName::Transactions,
            QueueName::TransactionsDlq,
            QueueName::Webhooks,
            QueueName::WebhooksDlq,
        ] {
            sqlx::query(
                "DELETE FROM jobs WHERE queue = $1 AND id NOT IN ( \
                     SELECT id FROM jobs WHERE queue = $1 ORDER BY created_at DESC LIMIT $2)",
            )
            .bind(queue.as_str())
            .bind(DLQ_MAX_LENGTH)
            .execute(&self.pool)
            .await?;
        }

        Ok(result.rows_affected())
    }
}

fn parse_queue_name(s: &str) -> QueueName {
    match s {
        "transactions" => QueueName::Transactions,
        "transactions.dlq" => QueueName::TransactionsDlq,
        "webhooks" => QueueName::Webhooks,
        "webhooks.dlq" => QueueName::WebhooksDlq,
        other => panic!("unknown queue name in jobs table: {other}"),
    }
}
