use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        helpers::domain_parsing::canonical_hostname,
        ports::{
            health_check::{DomainHealthCheck, HealthStatus},
            job_queue::JobScheduler,
        },
    },
    domain::entities::{
        business::{Business, BusinessId, BusinessStatus, cname_due_cutoff},
        domain_job::DomainJob,
        domain_state::{DomainEvent, DomainState},
    },
};

const JOB_NAME: &str = "DomainMonitoringJob";

/// Health checks per monitoring run before giving up.
pub const MAX_MONITORING_ATTEMPTS: i32 = 12;

pub const MONITORING_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Delay before the first certificate-propagation retry once the hostname
/// answers without a valid certificate.
pub const CERTIFICATE_RETRY_KICK_DELAY: Duration = Duration::from_secs(5);

#[async_trait]
pub trait BusinessRepo: Send + Sync {
    async fn get_by_id(&self, business_id: BusinessId) -> AppResult<Option<Business>>;
    async fn record_check(&self, business_id: BusinessId, update: &CheckUpdate) -> AppResult<Business>;
    async fn set_monitoring_active(&self, business_id: BusinessId, active: bool) -> AppResult<Business>;
    /// Reset the attempt counter and put the business back into monitoring.
    async fn restart_monitoring(&self, business_id: BusinessId) -> AppResult<Business>;
    async fn set_render_domain_added(&self, business_id: BusinessId, added: bool) -> AppResult<Business>;
    /// Custom-domain businesses under active monitoring that were never
    /// checked or last checked at or before `checked_before`.
    async fn list_due_for_monitoring(
        &self,
        checked_before: NaiveDateTime,
        max_attempts: i32,
    ) -> AppResult<Vec<Business>>;
}

/// Columns written after one health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckUpdate {
    pub attempts: i32,
    pub status: BusinessStatus,
    pub monitoring_active: bool,
    pub checked_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// The hostname answered.
    pub success: bool,
    /// The hostname answered over HTTPS with a valid certificate.
    pub verified: bool,
    pub should_continue: bool,
    pub attempts: i32,
    pub max_attempts: i32,
    pub health: HealthStatus,
}

/// Gate evaluated before every monitoring run.
pub fn should_continue_monitoring(business: &Business) -> bool {
    business.status == BusinessStatus::CnameMonitoring
        && business.cname_monitoring_active
        && business.cname_check_attempts < MAX_MONITORING_ATTEMPTS
        && business.is_custom_domain()
        && business.custom_hostname().is_some()
}

/// Runs a single health check for a business and records the outcome.
#[derive(Clone)]
pub struct DomainMonitoringService {
    repo: Arc<dyn BusinessRepo>,
    health_checker: Arc<dyn DomainHealthCheck>,
}

impl DomainMonitoringService {
    pub fn new(repo: Arc<dyn BusinessRepo>, health_checker: Arc<dyn DomainHealthCheck>) -> Self {
        Self {
            repo,
            health_checker,
        }
    }

    #[instrument(skip(self, business), fields(business_id = business.id))]
    pub async fn perform_check(&self, business: &Business) -> AppResult<CheckResult> {
        let hostname = business
            .custom_hostname()
            .ok_or_else(|| AppError::InvalidInput("Business has no custom hostname".into()))?;
        let target = canonical_hostname(hostname, business.canonical_preference);

        let health = self.health_checker.check_health(&target).await;
        let verified = health.is_verified();

        let current = DomainState::from_business(business);
        let next = current.transition(
            DomainEvent::CheckCompleted { verified },
            MAX_MONITORING_ATTEMPTS,
        );

        let attempts = business.cname_check_attempts.saturating_add(1);
        let status = if next != current {
            next.status()
        } else {
            business.status
        };
        let monitoring_active = business.cname_monitoring_active && !next.is_terminal();

        let update = CheckUpdate {
            attempts,
            status,
            monitoring_active,
            checked_at: Utc::now().naive_utc(),
        };
        self.repo.record_check(business.id, &update).await?;

        match next {
            DomainState::Active => {
                info!(job = JOB_NAME, domain = %target, attempts, "Custom domain verified");
            }
            DomainState::Failed => {
                warn!(
                    job = JOB_NAME,
                    domain = %target,
                    attempts,
                    "Custom domain monitoring timed out"
                );
            }
            _ => {
                debug!(
                    job = JOB_NAME,
                    domain = %target,
                    attempts,
                    healthy = health.healthy,
                    ssl_ready = health.ssl_ready,
                    "Custom domain not ready yet"
                );
            }
        }

        Ok(CheckResult {
            success: health.healthy,
            verified,
            should_continue: monitoring_active && matches!(next, DomainState::Monitoring { .. }),
            attempts,
            max_attempts: MAX_MONITORING_ATTEMPTS,
            health,
        })
    }
}

/// Self-rescheduling poll of a business's custom domain.
#[derive(Clone)]
pub struct DomainMonitoringJob {
    repo: Arc<dyn BusinessRepo>,
    service: DomainMonitoringService,
    scheduler: Arc<dyn JobScheduler>,
}

impl DomainMonitoringJob {
    pub fn new(
        repo: Arc<dyn BusinessRepo>,
        health_checker: Arc<dyn DomainHealthCheck>,
        scheduler: Arc<dyn JobScheduler>,
    ) -> Self {
        Self {
            service: DomainMonitoringService::new(repo.clone(), health_checker),
            repo,
            scheduler,
        }
    }

    #[instrument(skip(self))]
    pub async fn perform(&self, business_id: BusinessId) -> AppResult<()> {
        let business = match self.repo.get_by_id(business_id).await {
            Ok(Some(business)) => business,
            Ok(None) => {
                warn!(job = JOB_NAME, business_id, "Business not found, monitoring ends");
                return Ok(());
            }
            Err(e) => {
                error!(job = JOB_NAME, business_id, error = %e, "Failed to load business, monitoring ends");
                return Ok(());
            }
        };

        if !should_continue_monitoring(&business) {
            info!(
                job = JOB_NAME,
                business_id,
                status = %business.status,
                attempts = business.cname_check_attempts,
                monitoring_active = business.cname_monitoring_active,
                "Business no longer eligible for monitoring"
            );
            return Ok(());
        }

        if let Some(remaining) = business.next_check_due_in(Utc::now().naive_utc()) {
            let delay = remaining
                .to_std()
                .unwrap_or(Duration::ZERO)
                .max(Duration::from_secs(1));
            debug!(
                job = JOB_NAME,
                business_id,
                delay_secs = delay.as_secs(),
                "Checked recently, deferring"
            );
            self.scheduler
                .enqueue(DomainJob::DomainMonitoring { business_id }, delay)
                .await?;
            return Ok(());
        }

        let result = self.service.perform_check(&business).await?;

        if result.should_continue {
            if result.health.healthy && !result.health.ssl_ready {
                self.kick_certificate_retry(business_id).await;
            }
            self.scheduler
                .enqueue(DomainJob::DomainMonitoring { business_id }, MONITORING_INTERVAL)
                .await?;
        }

        Ok(())
    }

    async fn kick_certificate_retry(&self, business_id: BusinessId) {
        let job = DomainJob::CertificatePropagationRetry {
            business_id,
            retry_count: 0,
        };
        // A chain already pending or running keeps its own position
        match self
            .scheduler
            .enqueue_if_idle(job, CERTIFICATE_RETRY_KICK_DELAY)
            .await
        {
            Ok(Some(_)) => {
                info!(job = JOB_NAME, business_id, "Hostname reachable without certificate, retry chain started");
            }
            Ok(None) => {
                debug!(job = JOB_NAME, business_id, "Certificate retry chain already in flight");
            }
            Err(e) => {
                warn!(job = JOB_NAME, business_id, error = %e, "Failed to start certificate retry chain");
            }
        }
    }

    /// Enqueue the first poll for a business.
    #[instrument(skip(self))]
    pub async fn start_monitoring(&self, business_id: BusinessId) -> AppResult<Option<Uuid>> {
        let job_id = self
            .scheduler
            .enqueue(DomainJob::DomainMonitoring { business_id }, Duration::ZERO)
            .await?;
        info!(job = JOB_NAME, business_id, "Monitoring started");
        Ok(job_id)
    }

    /// Disable monitoring. Jobs already queued exit at their gate.
    #[instrument(skip(self))]
    pub async fn stop_monitoring(&self, business_id: BusinessId) -> AppResult<Business> {
        let business = self.repo.set_monitoring_active(business_id, false).await?;
        info!(job = JOB_NAME, business_id, "Monitoring stopped");
        Ok(business)
    }

    /// Operator restart: reset the attempt budget and poll again.
    #[instrument(skip(self))]
    pub async fn restart_monitoring(&self, business_id: BusinessId) -> AppResult<Business> {
        let business = self
            .repo
            .get_by_id(business_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if !business.is_custom_domain() || business.custom_hostname().is_none() {
            return Err(AppError::InvalidInput(
                "Monitoring is only available for businesses with a custom domain".into(),
            ));
        }

        let business = self.repo.restart_monitoring(business_id).await?;
        self.start_monitoring(business_id).await?;
        Ok(business)
    }

    /// Enqueue a poll for every business that is due. Returns how many jobs
    /// were enqueued; businesses with a poll already pending are skipped.
    #[instrument(skip(self))]
    pub async fn monitor_all_pending(&self) -> AppResult<usize> {
        let cutoff = cname_due_cutoff(Utc::now().naive_utc());
        let businesses = self
            .repo
            .list_due_for_monitoring(cutoff, MAX_MONITORING_ATTEMPTS)
            .await?;

        let mut enqueued = 0;
        for business in businesses.iter().filter(|b| should_continue_monitoring(b)) {
            let job = DomainJob::DomainMonitoring {
                business_id: business.id,
            };
            match self.scheduler.enqueue(job, Duration::ZERO).await {
                Ok(Some(_)) => enqueued += 1,
                Ok(None) => {}
                Err(e) => {
                    error!(
                        job = JOB_NAME,
                        business_id = business.id,
                        error = %e,
                        "Failed to enqueue monitoring job"
                    );
                }
            }
        }

        if enqueued > 0 {
            info!(job = JOB_NAME, enqueued, "Enqueued pending domain checks");
        }
        Ok(enqueued)
    }
}
