use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{app_error::AppResult, domain::entities::domain_job::DomainJob};

/// Deferred execution of domain jobs.
#[async_trait]
pub trait JobScheduler: Send + Sync {
    /// Enqueue `job` to run after `delay`. Returns `None` when an equivalent
    /// pending job already exists (see [`DomainJob::dedupe_key`]). A pending
    /// job that `job` supersedes is replaced instead and keeps its id.
    async fn enqueue(&self, job: DomainJob, delay: Duration) -> AppResult<Option<Uuid>>;

    /// Enqueue `job` only when no pending or running job shares its dedupe
    /// key. Used to start a chain without disturbing one in flight.
    async fn enqueue_if_idle(&self, job: DomainJob, delay: Duration) -> AppResult<Option<Uuid>>;
}

/// A job row claimed by a worker.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub id: Uuid,
    pub job_type: String,
    pub payload: serde_json::Value,
    /// Attempts made before this run.
    pub attempts: i32,
    pub max_attempts: i32,
}

#[async_trait]
pub trait JobQueueRepo: Send + Sync {
    async fn claim_due_jobs(&self, limit: i64) -> AppResult<Vec<ClaimedJob>>;
    async fn mark_succeeded(&self, job_id: Uuid) -> AppResult<()>;
    /// Record a failed run. `retry_in` puts the job back to pending, `None`
    /// marks it permanently failed.
    async fn mark_failed(
        &self,
        job_id: Uuid,
        attempts: i32,
        error: &str,
        retry_in: Option<Duration>,
    ) -> AppResult<()>;
    /// Return claims abandoned by crashed workers to the queue.
    async fn release_stale_jobs(&self, older_than: Duration) -> AppResult<u64>;
}
