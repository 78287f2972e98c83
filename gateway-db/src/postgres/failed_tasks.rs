use async_trait::async_trait;
use gateway_common::domain::FailedTask;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{map_sqlx, DbError};
use crate::repository::{FailedTaskRepository, FailedTaskStats};

pub struct PgFailedTaskRepository {
    pool: PgPool,
}

impl PgFailedTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const FAILED_TASK_COLUMNS: &str = "id, job_id, job_name, args, exception_type, exception_message, \
     traceback, retry_count, failed_at, replayed_at, replay_status, replay_notes, created_at";

#[async_trait]
impl FailedTaskRepository for PgFailedTaskRepository {
    async fn find_by_job_id(&self, job_id: Uuid) -> Result<Option<FailedTask>, DbError> {
        let query = format!("SELECT {FAILED_TASK_COLUMNS} FROM failed_tasks WHERE job_id = $1");
        sqlx::query_as::<_, FailedTask>(&query)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)
    }

    async fn create(
        &self,
        job_id: Uuid,
        job_name: &str,
        args: Value,
        exception_type: &str,
        exception_message: &str,
        traceback: Option<&str>,
        retry_count: Option<&str>,
    ) -> Result<FailedTask, DbError> {
        // `job_id` is unique: a crash that re-delivers the same exhausted job
        // must not create a second DLQ row, so a conflicting insert is
        // resolved by fetching the existing row instead of erroring.
        let query = format!(
            "INSERT INTO failed_tasks (id, job_id, job_name, args, exception_type, \
             exception_message, traceback, retry_count) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (job_id) DO NOTHING RETURNING {FAILED_TASK_COLUMNS}"
        );
        let row = sqlx::query_as::<_, FailedTask>(&query)
            .bind(Uuid::new_v4())
            .bind(job_id)
            .bind(job_name)
            .bind(args)
            .bind(exception_type)
            .bind(exception_message)
            .bind(traceback)
            .bind(retry_count)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx(e, "failed task already recorded"))?;
        match row {
            Some(r) => Ok(r),
            None => self
                .find_by_job_id(job_id)
                .await?
                .ok_or(DbError::NotFound),
        }
    }

    async fn mark_replayed(&self, id: Uuid, replay_status: &str, replay_notes: &str) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE failed_tasks SET replayed_at = now(), replay_status = $2, replay_notes = $3 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(replay_status)
        .bind(replay_notes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn stats(&self) -> Result<FailedTaskStats, DbError> {
        let row: (i64, i64, i64) = sqlx::query_as(
            "SELECT count(*), \
                    count(*) FILTER (WHERE failed_at > now() - interval '24 hours'), \
                    count(*) FILTER (WHERE replayed_at IS NULL) \
             FROM failed_tasks",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(FailedTaskStats {
            total: row.0,
            recent_24h: row.1,
            unreplayed: row.2,
        })
    }
}
