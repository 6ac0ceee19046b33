use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::application::{
    ports::job_queue::{ClaimedJob, JobQueueRepo},
    use_cases::job_runner::DomainJobRunner,
};
use crate::domain::entities::domain_job::DomainJob;

const STALE_CHECK_INTERVAL_SECS: u64 = 60;
/// Claims older than this belong to a crashed worker.
const STALE_CLAIM_AFTER: Duration = Duration::from_secs(10 * 60);
const BATCH_SIZE: i64 = 20;
const MAX_CONCURRENT_JOBS: usize = 5;

const BACKOFF_BASE_SECS: u64 = 30;
const BACKOFF_CAP_SECS: u64 = 15 * 60;
const BACKOFF_JITTER_SECS: u64 = 10;

pub struct WorkerSettings {
    pub poll_interval: Duration,
    pub sweep_interval: Duration,
}

pub async fn run_job_worker_loop(
    queue: Arc<dyn JobQueueRepo>,
    runner: Arc<DomainJobRunner>,
    settings: WorkerSettings,
) {
    let mut poll_ticker = interval(settings.poll_interval);
    let mut stale_ticker = interval(Duration::from_secs(STALE_CHECK_INTERVAL_SECS));
    let mut sweep_ticker = interval(settings.sweep_interval);

    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_JOBS));

    info!(
        "Domain job worker started (polling every {}s, sweeping every {}s, max {} concurrent)",
        settings.poll_interval.as_secs(),
        settings.sweep_interval.as_secs(),
        MAX_CONCURRENT_JOBS
    );

    loop {
        tokio::select! {
            _ = poll_ticker.tick() => {
                process_batch(&queue, &runner, &semaphore).await;
            }
            _ = stale_ticker.tick() => {
                release_stale(queue.as_ref()).await;
            }
            _ = sweep_ticker.tick() => {
                sweep(&runner).await;
            }
        }
    }
}

/// Claim and run one batch of due jobs. Returns the number of jobs claimed.
pub async fn process_batch(
    queue: &Arc<dyn JobQueueRepo>,
    runner: &Arc<DomainJobRunner>,
    semaphore: &Arc<Semaphore>,
) -> usize {
    let jobs = match queue.claim_due_jobs(BATCH_SIZE).await {
        Ok(jobs) => jobs,
        Err(e) => {
            error!(error = %e, "Failed to claim due domain jobs");
            return 0;
        }
    };

    if jobs.is_empty() {
        return 0;
    }

    let count = jobs.len();
    info!(count, "Processing domain jobs");

    let mut handles = Vec::with_capacity(count);

    for job in jobs {
        let queue = Arc::clone(queue);
        let runner = Arc::clone(runner);
        let sem = Arc::clone(semaphore);

        handles.push(tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            run_one(queue.as_ref(), &runner, job).await;
        }));
    }

    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "Domain job task panicked");
        }
    }

    count
}

async fn run_one(queue: &dyn JobQueueRepo, runner: &DomainJobRunner, claimed: ClaimedJob) {
    let attempts = claimed.attempts.saturating_add(1);

    let job: DomainJob = match serde_json::from_value(claimed.payload.clone()) {
        Ok(job) => job,
        Err(e) => {
            error!(
                job_id = %claimed.id,
                job_type = %claimed.job_type,
                error = %e,
                "Undecodable job payload"
            );
            record_failure(queue, &claimed, attempts, &format!("invalid payload: {e}"), None).await;
            return;
        }
    };

    match runner.run(&job).await {
        Ok(()) => {
            if let Err(e) = queue.mark_succeeded(claimed.id).await {
                error!(job_id = %claimed.id, error = %e, "Failed to mark job succeeded");
            }
        }
        Err(e) => {
            let retry_in = (attempts < claimed.max_attempts).then(|| calculate_backoff_delay(claimed.attempts));
            warn!(
                job_id = %claimed.id,
                job_type = %claimed.job_type,
                business_id = job.business_id(),
                attempts,
                max_attempts = claimed.max_attempts,
                retry_in_secs = retry_in.map(|d| d.as_secs()),
                error = %e,
                "Domain job failed"
            );
            record_failure(queue, &claimed, attempts, &e.to_string(), retry_in).await;
        }
    }
}

async fn record_failure(
    queue: &dyn JobQueueRepo,
    claimed: &ClaimedJob,
    attempts: i32,
    error: &str,
    retry_in: Option<Duration>,
) {
    if let Err(e) = queue.mark_failed(claimed.id, attempts, error, retry_in).await {
        error!(job_id = %claimed.id, error = %e, "Failed to record job failure");
    }
}

async fn release_stale(queue: &dyn JobQueueRepo) {
    match queue.release_stale_jobs(STALE_CLAIM_AFTER).await {
        Ok(count) if count > 0 => {
            warn!(count, "Released stale domain job claims");
        }
        Ok(_) => {}
        Err(e) => {
            error!(error = %e, "Failed to release stale domain jobs");
        }
    }
}

async fn sweep(runner: &DomainJobRunner) {
    if let Err(e) = runner.monitoring().monitor_all_pending().await {
        error!(error = %e, "Monitoring sweep failed");
    }
}

/// Delay before retrying a failed job: 30s doubled per previous attempt,
/// capped at 15 minutes, plus up to 10s jitter.
pub fn calculate_backoff_delay(previous_attempts: i32) -> Duration {
    let exponent = previous_attempts.clamp(0, 16) as u32;
    let exponential = BACKOFF_BASE_SECS.saturating_mul(2u64.saturating_pow(exponent));
    let capped = exponential.min(BACKOFF_CAP_SECS);
    let jitter = rand::random::<u64>() % (BACKOFF_JITTER_SECS + 1);
    Duration::from_secs(capped + jitter)
}
