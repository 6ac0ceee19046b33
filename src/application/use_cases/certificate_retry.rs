use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::{
    app_error::AppResult,
    application::{
        helpers::domain_parsing::{apex_hostname, canonical_hostname, www_hostname},
        ports::{
            domain_hosting::DomainHostingProvider, health_check::DomainHealthCheck,
            job_queue::JobScheduler,
        },
        use_cases::{domain_monitoring::BusinessRepo, domain_verification::schedule_verification},
    },
    domain::entities::{
        business::{Business, BusinessId, BusinessStatus},
        domain_job::DomainJob,
    },
};

const JOB_NAME: &str = "CertificatePropagationRetryJob";

pub const MAX_RETRY_ATTEMPTS: i32 = 6;

/// Retries from this count on tear the domain down and re-add it.
pub const REBUILD_THRESHOLD: i32 = 3;

/// Wait between removing domains and re-adding them.
pub const REBUILD_COOLDOWN: Duration = Duration::from_secs(10);

/// Offset of the `www` verification relative to the apex one.
pub const WWW_VERIFICATION_OFFSET: Duration = Duration::from_secs(30);

const RETRY_DELAY_MINUTES: [u64; 6] = [5, 10, 20, 30, 30, 30];
const MAX_RETRY_DELAY_MINUTES: u64 = 30;

/// Delay before the retry following `retry_count`.
pub fn calculate_next_delay(retry_count: i32) -> Duration {
    let minutes = usize::try_from(retry_count)
        .ok()
        .and_then(|i| RETRY_DELAY_MINUTES.get(i).copied())
        .unwrap_or(MAX_RETRY_DELAY_MINUTES)
        .min(MAX_RETRY_DELAY_MINUTES);
    Duration::from_secs(minutes * 60)
}

pub fn should_continue_retry(business: &Business, retry_count: i32) -> bool {
    matches!(
        business.status,
        BusinessStatus::CnameMonitoring | BusinessStatus::CnameActive
    ) && business.is_custom_domain()
        && business.custom_hostname().is_some()
        && (0..MAX_RETRY_ATTEMPTS).contains(&retry_count)
}

/// Bounded, escalating retry that nudges the provider into issuing a
/// certificate and rebuilds the domain when nudging is not enough.
#[derive(Clone)]
pub struct CertificatePropagationRetryJob {
    repo: Arc<dyn BusinessRepo>,
    provider: Arc<dyn DomainHostingProvider>,
    health_checker: Arc<dyn DomainHealthCheck>,
    scheduler: Arc<dyn JobScheduler>,
}

impl CertificatePropagationRetryJob {
    pub fn new(
        repo: Arc<dyn BusinessRepo>,
        provider: Arc<dyn DomainHostingProvider>,
        health_checker: Arc<dyn DomainHealthCheck>,
        scheduler: Arc<dyn JobScheduler>,
    ) -> Self {
        Self {
            repo,
            provider,
            health_checker,
            scheduler,
        }
    }

    #[instrument(skip(self))]
    pub async fn perform(&self, business_id: BusinessId, retry_count: i32) -> AppResult<()> {
        let Some(business) = self.repo.get_by_id(business_id).await? else {
            warn!(job = JOB_NAME, business_id, "Business not found, retry chain ends");
            return Ok(());
        };

        if !should_continue_retry(&business, retry_count) {
            info!(
                job = JOB_NAME,
                business_id,
                retry_count,
                status = %business.status,
                "Retry conditions no longer met"
            );
            return Ok(());
        }

        if self.ssl_now_working(&business).await {
            info!(job = JOB_NAME, business_id, retry_count, "Certificate is live, retry chain ends");
            return Ok(());
        }

        if retry_count < REBUILD_THRESHOLD {
            self.nudge_verification(&business).await;
        } else {
            self.rebuild_domains(&business).await?;
        }

        self.schedule_next_retry(business_id, retry_count).await
    }

    async fn ssl_now_working(&self, business: &Business) -> bool {
        let Some(hostname) = business.custom_hostname() else {
            return false;
        };
        let target = canonical_hostname(hostname, business.canonical_preference);
        self.health_checker.check_health(&target).await.is_verified()
    }

    /// Non-destructive: ask the provider to re-verify the apex domain and
    /// schedule a verification of the `www` alias.
    async fn nudge_verification(&self, business: &Business) {
        let Some(hostname) = business.custom_hostname() else {
            return;
        };
        let apex = apex_hostname(hostname);

        match self.provider.find_domain_by_name(&apex).await {
            Ok(Some(domain)) => match self.provider.verify_domain(&domain.id).await {
                Ok(()) => {
                    info!(job = JOB_NAME, business_id = business.id, domain = %apex, "Re-triggered domain verification");
                }
                Err(e) => {
                    warn!(job = JOB_NAME, business_id = business.id, domain = %apex, error = %e, "Domain verification request failed");
                }
            },
            Ok(None) => {
                warn!(job = JOB_NAME, business_id = business.id, domain = %apex, "Domain not registered at provider");
            }
            Err(e) => {
                warn!(job = JOB_NAME, business_id = business.id, domain = %apex, error = %e, "Domain lookup failed");
            }
        }

        schedule_verification(
            self.scheduler.as_ref(),
            business.id,
            www_hostname(hostname),
            WWW_VERIFICATION_OFFSET,
            JOB_NAME,
        )
        .await;
    }

    /// Destructive: remove both variants and hand off to the rebuild
    /// continuation. Provider errors propagate.
    async fn rebuild_domains(&self, business: &Business) -> AppResult<()> {
        let Some(hostname) = business.custom_hostname() else {
            return Ok(());
        };

        for name in [apex_hostname(hostname), www_hostname(hostname)] {
            match self.provider.find_domain_by_name(&name).await? {
                Some(domain) => {
                    self.provider.remove_domain(&domain.id).await?;
                    info!(job = JOB_NAME, business_id = business.id, domain = %name, "Removed domain for rebuild");
                }
                None => {
                    info!(job = JOB_NAME, business_id = business.id, domain = %name, "Domain already absent");
                }
            }
        }

        self.repo.set_render_domain_added(business.id, false).await?;

        self.scheduler
            .enqueue(
                DomainJob::DomainRebuildContinue {
                    business_id: business.id,
                },
                REBUILD_COOLDOWN,
            )
            .await?;

        info!(job = JOB_NAME, business_id = business.id, "Rebuild scheduled");
        Ok(())
    }

    async fn schedule_next_retry(&self, business_id: BusinessId, retry_count: i32) -> AppResult<()> {
        let next = retry_count + 1;
        if next >= MAX_RETRY_ATTEMPTS {
            warn!(job = JOB_NAME, business_id, retry_count, "Retry budget exhausted");
            return Ok(());
        }

        let delay = calculate_next_delay(retry_count);
        let job_id = self
            .scheduler
            .enqueue(
                DomainJob::CertificatePropagationRetry {
                    business_id,
                    retry_count: next,
                },
                delay,
            )
            .await?;

        if job_id.is_none() {
            warn!(
                job = JOB_NAME,
                business_id,
                next_retry = next,
                "A retry at or past this step is already pending, continuation dropped"
            );
            return Ok(());
        }

        info!(
            job = JOB_NAME,
            business_id,
            next_retry = next,
            delay_mins = delay.as_secs() / 60,
            "Next retry scheduled"
        );
        Ok(())
    }
}
