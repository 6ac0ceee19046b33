use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::{
    app_error::AppResult,
    application::{
        helpers::domain_parsing::{apex_hostname, determine_domains_to_add, www_hostname},
        ports::{domain_hosting::DomainHostingProvider, job_queue::JobScheduler},
        use_cases::{
            certificate_retry::WWW_VERIFICATION_OFFSET, domain_monitoring::BusinessRepo,
            domain_verification::schedule_verification,
        },
    },
    domain::entities::business::BusinessId,
};

const JOB_NAME: &str = "DomainRebuildContinueJob";

/// Second half of a rebuild: re-add the canonical domain and verify both
/// variants.
#[derive(Clone)]
pub struct DomainRebuildContinueJob {
    repo: Arc<dyn BusinessRepo>,
    provider: Arc<dyn DomainHostingProvider>,
    scheduler: Arc<dyn JobScheduler>,
}

impl DomainRebuildContinueJob {
    pub fn new(
        repo: Arc<dyn BusinessRepo>,
        provider: Arc<dyn DomainHostingProvider>,
        scheduler: Arc<dyn JobScheduler>,
    ) -> Self {
        Self {
            repo,
            provider,
            scheduler,
        }
    }

    #[instrument(skip(self))]
    pub async fn perform(&self, business_id: BusinessId) -> AppResult<()> {
        let Some(business) = self.repo.get_by_id(business_id).await? else {
            warn!(job = JOB_NAME, business_id, "Business not found, rebuild abandoned");
            return Ok(());
        };

        if !business.is_custom_domain() {
            warn!(
                job = JOB_NAME,
                business_id,
                host_type = business.host_type.as_str(),
                "Business no longer uses a custom domain, rebuild abandoned"
            );
            return Ok(());
        }

        let Some(hostname) = business.custom_hostname() else {
            warn!(job = JOB_NAME, business_id, "Business has no hostname, rebuild abandoned");
            return Ok(());
        };

        for name in determine_domains_to_add(hostname, business.canonical_preference) {
            match self.provider.add_domain(&name).await {
                Ok(domain) => {
                    info!(job = JOB_NAME, business_id, domain = %name, domain_id = %domain.id, "Re-added domain");
                }
                Err(e) if e.is_conflict() => {
                    info!(job = JOB_NAME, business_id, domain = %name, "Domain already registered");
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.repo.set_render_domain_added(business_id, true).await?;

        // The provider registers propagation status per name, so both
        // variants are verified whichever one was added.
        schedule_verification(
            self.scheduler.as_ref(),
            business_id,
            apex_hostname(hostname),
            Duration::ZERO,
            JOB_NAME,
        )
        .await;
        schedule_verification(
            self.scheduler.as_ref(),
            business_id,
            www_hostname(hostname),
            WWW_VERIFICATION_OFFSET,
            JOB_NAME,
        )
        .await;

        Ok(())
    }
}
