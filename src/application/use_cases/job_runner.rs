use std::sync::Arc;

use crate::{
    app_error::AppResult,
    application::use_cases::{
        certificate_retry::CertificatePropagationRetryJob, domain_monitoring::DomainMonitoringJob,
        domain_rebuild::DomainRebuildContinueJob, domain_verification::DomainVerificationJob,
    },
    domain::entities::domain_job::DomainJob,
};

/// Dispatches queued [`DomainJob`]s to their implementations.
#[derive(Clone)]
pub struct DomainJobRunner {
    monitoring: Arc<DomainMonitoringJob>,
    certificate_retry: Arc<CertificatePropagationRetryJob>,
    rebuild: Arc<DomainRebuildContinueJob>,
    verification: Arc<DomainVerificationJob>,
}

impl DomainJobRunner {
    pub fn new(
        monitoring: Arc<DomainMonitoringJob>,
        certificate_retry: Arc<CertificatePropagationRetryJob>,
        rebuild: Arc<DomainRebuildContinueJob>,
        verification: Arc<DomainVerificationJob>,
    ) -> Self {
        Self {
            monitoring,
            certificate_retry,
            rebuild,
            verification,
        }
    }

    pub fn monitoring(&self) -> &Arc<DomainMonitoringJob> {
        &self.monitoring
    }

    pub async fn run(&self, job: &DomainJob) -> AppResult<()> {
        match job {
            DomainJob::DomainMonitoring { business_id } => self.monitoring.perform(*business_id).await,
            DomainJob::CertificatePropagationRetry {
                business_id,
                retry_count,
            } => {
                self.certificate_retry
                    .perform(*business_id, *retry_count)
                    .await
            }
            DomainJob::DomainRebuildContinue { business_id } => self.rebuild.perform(*business_id).await,
            DomainJob::DomainVerification {
                business_id,
                domain_name,
            } => self.verification.perform(*business_id, domain_name).await,
        }
    }
}
