use std::time::Duration;

use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::ports::job_queue::{ClaimedJob, JobQueueRepo, JobScheduler},
    domain::entities::domain_job::DomainJob,
};

fn row_to_claimed(row: sqlx::postgres::PgRow) -> ClaimedJob {
    ClaimedJob {
        id: row.get("id"),
        job_type: row.get("job_type"),
        payload: row.get("payload"),
        attempts: row.get("attempts"),
        max_attempts: row.get("max_attempts"),
    }
}

fn job_payload(job: &DomainJob) -> AppResult<serde_json::Value> {
    serde_json::to_value(job).map_err(|e| AppError::Internal(e.to_string()))
}

// `InMemoryJobQueue` in `test_utils::job_mocks` mirrors the dedupe, supersede,
// failure and stale-release rules below; keep the two in step.
#[async_trait]
impl JobScheduler for PostgresPersistence {
    async fn enqueue(&self, job: DomainJob, delay: Duration) -> AppResult<Option<Uuid>> {
        let payload = job_payload(&job)?;

        // The partial unique index only covers pending rows, so a running job
        // can always enqueue its own successor. A later certificate retry
        // takes over a pending earlier one (see `DomainJob::supersedes`).
        let row = sqlx::query(
            r#"
            INSERT INTO domain_jobs (id, job_type, business_id, payload, run_at, dedupe_key)
            VALUES ($1, $2, $3, $4, NOW() + make_interval(secs => $5::double precision), $6)
            ON CONFLICT (dedupe_key) WHERE status = 'pending' DO UPDATE
            SET payload = EXCLUDED.payload,
                run_at = EXCLUDED.run_at,
                attempts = 0,
                last_error = NULL,
                updated_at = NOW()
            WHERE domain_jobs.job_type = 'certificate_propagation_retry'
              AND EXCLUDED.job_type = 'certificate_propagation_retry'
              AND (domain_jobs.payload->>'retry_count')::int
                  < (EXCLUDED.payload->>'retry_count')::int
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job.job_type())
        .bind(job.business_id())
        .bind(payload)
        .bind(delay.as_secs_f64())
        .bind(job.dedupe_key())
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(|r| r.get("id")))
    }

    async fn enqueue_if_idle(&self, job: DomainJob, delay: Duration) -> AppResult<Option<Uuid>> {
        let payload = job_payload(&job)?;

        let row = sqlx::query(
            r#"
            INSERT INTO domain_jobs (id, job_type, business_id, payload, run_at, dedupe_key)
            SELECT $1, $2, $3, $4, NOW() + make_interval(secs => $5::double precision), $6::text
            WHERE NOT EXISTS (
                SELECT 1 FROM domain_jobs
                WHERE dedupe_key = $6::text AND status IN ('pending', 'running')
            )
            ON CONFLICT (dedupe_key) WHERE status = 'pending' DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job.job_type())
        .bind(job.business_id())
        .bind(payload)
        .bind(delay.as_secs_f64())
        .bind(job.dedupe_key())
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(|r| r.get("id")))
    }
}

#[async_trait]
impl JobQueueRepo for PostgresPersistence {
    async fn claim_due_jobs(&self, limit: i64) -> AppResult<Vec<ClaimedJob>> {
        let rows = sqlx::query(
            r#"
            UPDATE domain_jobs
            SET status = 'running', locked_at = NOW(), updated_at = NOW()
            WHERE id IN (
                SELECT id FROM domain_jobs
                WHERE status = 'pending' AND run_at <= NOW()
                ORDER BY run_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, job_type, payload, attempts, max_attempts
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(row_to_claimed).collect())
    }

    async fn mark_succeeded(&self, job_id: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE domain_jobs
            SET status = 'succeeded', locked_at = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        job_id: Uuid,
        attempts: i32,
        error: &str,
        retry_in: Option<Duration>,
    ) -> AppResult<()> {
        // A retry yields to a pending job of the same chain that was enqueued
        // while this one ran.
        sqlx::query(
            r#"
            UPDATE domain_jobs j
            SET status = CASE
                    WHEN $4::double precision IS NOT NULL AND NOT EXISTS (
                        SELECT 1 FROM domain_jobs o
                        WHERE o.dedupe_key = j.dedupe_key
                          AND o.status = 'pending'
                          AND o.id <> j.id
                    ) THEN 'pending'
                    ELSE 'failed'
                END,
                attempts = $2,
                last_error = $3,
                run_at = NOW() + make_interval(secs => coalesce($4::double precision, 0)),
                locked_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(attempts)
        .bind(error)
        .bind(retry_in.map(|d| d.as_secs_f64()))
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn release_stale_jobs(&self, older_than: Duration) -> AppResult<u64> {
        let mut tx = self.pool().begin().await.map_err(AppError::from)?;

        sqlx::query(
            r#"
            UPDATE domain_jobs j
            SET status = 'failed', last_error = 'superseded after stale claim',
                locked_at = NULL, updated_at = NOW()
            WHERE j.status = 'running'
              AND j.locked_at < NOW() - make_interval(secs => $1::double precision)
              AND EXISTS (
                  SELECT 1 FROM domain_jobs o
                  WHERE o.dedupe_key = j.dedupe_key AND o.status = 'pending'
              )
            "#,
        )
        .bind(older_than.as_secs_f64())
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        let result = sqlx::query(
            r#"
            UPDATE domain_jobs
            SET status = 'pending', locked_at = NULL, updated_at = NOW()
            WHERE status = 'running'
              AND locked_at < NOW() - make_interval(secs => $1::double precision)
            "#,
        )
        .bind(older_than.as_secs_f64())
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;
        Ok(result.rows_affected())
    }
}
