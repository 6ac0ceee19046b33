//! In-memory job scheduling and queue mocks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::job_queue::{ClaimedJob, JobQueueRepo, JobScheduler},
    domain::entities::domain_job::{DomainJob, JobStatus},
};

/// A job captured by [`RecordingJobScheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    pub job: DomainJob,
    pub delay: Duration,
}

/// Scheduler that records every enqueue for assertions.
#[derive(Default)]
pub struct RecordingJobScheduler {
    scheduled: Mutex<Vec<ScheduledJob>>,
    fail: bool,
}

impl RecordingJobScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scheduler whose every enqueue fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn scheduled(&self) -> Vec<ScheduledJob> {
        self.scheduled.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobScheduler for RecordingJobScheduler {
    async fn enqueue(&self, job: DomainJob, delay: Duration) -> AppResult<Option<Uuid>> {
        if self.fail {
            return Err(AppError::Internal("job queue unavailable".into()));
        }
        self.scheduled
            .lock()
            .unwrap()
            .push(ScheduledJob { job, delay });
        Ok(Some(Uuid::new_v4()))
    }

    async fn enqueue_if_idle(&self, job: DomainJob, delay: Duration) -> AppResult<Option<Uuid>> {
        self.enqueue(job, delay).await
    }
}

/// A row in [`InMemoryJobQueue`].
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub id: Uuid,
    pub job: DomainJob,
    pub status: JobStatus,
    pub run_at: DateTime<Utc>,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub locked_at: Option<DateTime<Utc>>,
}

/// In-memory `domain_jobs` table with the same dedupe and claim rules as the
/// Postgres adapter.
pub struct InMemoryJobQueue {
    pub jobs: Mutex<Vec<QueuedJob>>,
    max_attempts: i32,
}

impl InMemoryJobQueue {
    pub fn new(max_attempts: i32) -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            max_attempts,
        }
    }

    pub fn all(&self) -> Vec<QueuedJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn get(&self, job_id: Uuid) -> Option<QueuedJob> {
        self.all().into_iter().find(|j| j.id == job_id)
    }

    /// Move a pending job's `run_at` into the past so the next claim picks it up.
    pub fn make_due(&self, job_id: Uuid) {
        if let Some(job) = self.jobs.lock().unwrap().iter_mut().find(|j| j.id == job_id) {
            job.run_at = Utc::now() - chrono::Duration::seconds(1);
        }
    }

    fn update(&self, job_id: Uuid, apply: impl FnOnce(&mut QueuedJob)) -> AppResult<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs.iter_mut().find(|j| j.id == job_id).ok_or(AppError::NotFound)?;
        apply(job);
        Ok(())
    }
}

impl InMemoryJobQueue {
    fn shares_key(queued: &QueuedJob, key: &str, statuses: &[JobStatus]) -> bool {
        statuses.contains(&queued.status) && queued.job.dedupe_key().as_deref() == Some(key)
    }

    fn push(&self, jobs: &mut Vec<QueuedJob>, job: DomainJob, delay: Duration) -> Uuid {
        let id = Uuid::new_v4();
        jobs.push(QueuedJob {
            id,
            job,
            status: JobStatus::Pending,
            run_at: run_at_after(delay),
            attempts: 0,
            max_attempts: self.max_attempts,
            last_error: None,
            locked_at: None,
        });
        id
    }
}

fn run_at_after(delay: Duration) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero())
}

#[async_trait]
impl JobScheduler for InMemoryJobQueue {
    async fn enqueue(&self, job: DomainJob, delay: Duration) -> AppResult<Option<Uuid>> {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(key) = job.dedupe_key()
            && let Some(pending) = jobs
                .iter_mut()
                .find(|j| Self::shares_key(j, &key, &[JobStatus::Pending]))
        {
            if !job.supersedes(&pending.job) {
                return Ok(None);
            }
            pending.job = job;
            pending.run_at = run_at_after(delay);
            pending.attempts = 0;
            pending.last_error = None;
            return Ok(Some(pending.id));
        }

        Ok(Some(self.push(&mut jobs, job, delay)))
    }

    async fn enqueue_if_idle(&self, job: DomainJob, delay: Duration) -> AppResult<Option<Uuid>> {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(key) = job.dedupe_key()
            && jobs
                .iter()
                .any(|j| Self::shares_key(j, &key, &[JobStatus::Pending, JobStatus::Running]))
        {
            return Ok(None);
        }

        Ok(Some(self.push(&mut jobs, job, delay)))
    }
}

#[async_trait]
impl JobQueueRepo for InMemoryJobQueue {
    async fn claim_due_jobs(&self, limit: i64) -> AppResult<Vec<ClaimedJob>> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().unwrap();
        let mut claimed = Vec::new();
        for job in jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::Pending && j.run_at <= now)
            .take(limit.max(0) as usize)
        {
            job.status = JobStatus::Running;
            job.locked_at = Some(now);
            claimed.push(ClaimedJob {
                id: job.id,
                job_type: job.job.job_type().to_string(),
                payload: serde_json::to_value(&job.job)
                    .map_err(|e| AppError::Internal(e.to_string()))?,
                attempts: job.attempts,
                max_attempts: job.max_attempts,
            });
        }
        Ok(claimed)
    }

    async fn mark_succeeded(&self, job_id: Uuid) -> AppResult<()> {
        self.update(job_id, |j| {
            j.status = JobStatus::Succeeded;
            j.locked_at = None;
        })
    }

    async fn mark_failed(
        &self,
        job_id: Uuid,
        attempts: i32,
        error: &str,
        retry_in: Option<Duration>,
    ) -> AppResult<()> {
        let superseded = self.get(job_id).is_some_and(|failed| {
            let key = failed.job.dedupe_key();
            key.is_some()
                && self.all().iter().any(|j| {
                    j.id != job_id && j.status == JobStatus::Pending && j.job.dedupe_key() == key
                })
        });

        self.update(job_id, |j| {
            j.attempts = attempts;
            j.last_error = Some(error.to_string());
            j.locked_at = None;
            match retry_in {
                Some(delay) if !superseded => {
                    j.status = JobStatus::Pending;
                    j.run_at = run_at_after(delay);
                }
                _ => j.status = JobStatus::Failed,
            }
        })
    }

    async fn release_stale_jobs(&self, older_than: Duration) -> AppResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::from_std(older_than).unwrap_or(chrono::Duration::zero());
        let mut released = 0;
        for job in self.jobs.lock().unwrap().iter_mut() {
            if job.status == JobStatus::Running && job.locked_at.is_some_and(|t| t <= cutoff) {
                job.status = JobStatus::Pending;
                job.locked_at = None;
                released += 1;
            }
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pending_dedupe_coalesces_chains() {
        let queue = InMemoryJobQueue::new(5);
        let job = DomainJob::DomainMonitoring { business_id: 1 };

        let first = queue.enqueue(job.clone(), Duration::ZERO).await.unwrap();
        let second = queue.enqueue(job.clone(), Duration::ZERO).await.unwrap();
        assert!(first.is_some());
        assert!(second.is_none());

        // Once the pending row is claimed the chain may enqueue its successor
        queue.claim_due_jobs(10).await.unwrap();
        let third = queue.enqueue(job, Duration::from_secs(300)).await.unwrap();
        assert!(third.is_some());
    }

    #[tokio::test]
    async fn test_jobs_without_key_are_not_coalesced() {
        let queue = InMemoryJobQueue::new(5);
        let job = DomainJob::DomainRebuildContinue { business_id: 1 };

        assert!(queue.enqueue(job.clone(), Duration::ZERO).await.unwrap().is_some());
        assert!(queue.enqueue(job, Duration::ZERO).await.unwrap().is_some());
        assert_eq!(queue.all().len(), 2);
    }

    #[tokio::test]
    async fn test_future_jobs_are_not_claimed() {
        let queue = InMemoryJobQueue::new(5);
        queue
            .enqueue(DomainJob::DomainRebuildContinue { business_id: 1 }, Duration::from_secs(60))
            .await
            .unwrap();

        assert!(queue.claim_due_jobs(10).await.unwrap().is_empty());
    }

    fn retry(retry_count: i32) -> DomainJob {
        DomainJob::CertificatePropagationRetry {
            business_id: 5,
            retry_count,
        }
    }

    #[tokio::test]
    async fn test_later_retry_takes_over_pending_one() {
        let queue = InMemoryJobQueue::new(5);

        let kick = queue.enqueue(retry(0), Duration::ZERO).await.unwrap().unwrap();
        let continued = queue
            .enqueue(retry(4), Duration::from_secs(1800))
            .await
            .unwrap();

        assert_eq!(continued, Some(kick));
        assert!(queue.enqueue(retry(2), Duration::ZERO).await.unwrap().is_none());

        let jobs = queue.all();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job, retry(4));
        assert!(jobs[0].run_at > Utc::now() + chrono::Duration::minutes(29));
    }

    #[tokio::test]
    async fn test_idle_enqueue_waits_for_running_chain() {
        let queue = InMemoryJobQueue::new(5);
        queue.enqueue(retry(3), Duration::ZERO).await.unwrap();
        queue.claim_due_jobs(10).await.unwrap();

        assert!(queue.enqueue_if_idle(retry(0), Duration::ZERO).await.unwrap().is_none());

        let other = DomainJob::CertificatePropagationRetry {
            business_id: 6,
            retry_count: 0,
        };
        assert!(queue.enqueue_if_idle(other, Duration::ZERO).await.unwrap().is_some());
    }
}
