use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::{
    app_error::AppResult,
    application::ports::{domain_hosting::DomainHostingProvider, job_queue::JobScheduler},
    domain::entities::{business::BusinessId, domain_job::DomainJob},
};

const JOB_NAME: &str = "DomainVerificationJob";

/// Asks the provider to verify one domain by name.
#[derive(Clone)]
pub struct DomainVerificationJob {
    provider: Arc<dyn DomainHostingProvider>,
}

impl DomainVerificationJob {
    pub fn new(provider: Arc<dyn DomainHostingProvider>) -> Self {
        Self { provider }
    }

    #[instrument(skip(self))]
    pub async fn perform(&self, business_id: BusinessId, domain_name: &str) -> AppResult<()> {
        let Some(domain) = self.provider.find_domain_by_name(domain_name).await? else {
            warn!(job = JOB_NAME, business_id, domain = %domain_name, "Domain not registered at provider");
            return Ok(());
        };

        self.provider.verify_domain(&domain.id).await?;
        info!(
            job = JOB_NAME,
            business_id,
            domain = %domain_name,
            verification_status = ?domain.verification_status,
            "Domain verification requested"
        );
        Ok(())
    }
}

/// Enqueue a verification job. Failures are logged and swallowed: a missed
/// verification is picked up by the next retry.
pub(crate) async fn schedule_verification(
    scheduler: &dyn JobScheduler,
    business_id: BusinessId,
    domain_name: String,
    delay: Duration,
    caller: &'static str,
) {
    let job = DomainJob::DomainVerification {
        business_id,
        domain_name: domain_name.clone(),
    };
    if let Err(e) = scheduler.enqueue(job, delay).await {
        warn!(
            job = caller,
            business_id,
            domain = %domain_name,
            error = %e,
            "Failed to schedule domain verification"
        );
    }
}
