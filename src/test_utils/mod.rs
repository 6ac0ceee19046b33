//! Test utilities for integration testing.
//!
//! This module provides:
//! - Test data factories for creating valid test fixtures
//! - In-memory repositories, a job queue and provider fakes
//! - Helper builders for wiring jobs and `AppState` with test dependencies

mod factories;
mod job_mocks;
mod provider_mocks;

pub use app_state_builder::*;
pub use business_mocks::*;
pub use factories::*;
pub use job_mocks::*;
pub use provider_mocks::*;

use std::sync::Arc;

use crate::application::{
    ports::{
        domain_hosting::DomainHostingProvider, health_check::DomainHealthCheck,
        job_queue::JobScheduler,
    },
    use_cases::{
        certificate_retry::CertificatePropagationRetryJob,
        domain_monitoring::{BusinessRepo, DomainMonitoringJob},
        domain_rebuild::DomainRebuildContinueJob,
        domain_verification::DomainVerificationJob,
        job_runner::DomainJobRunner,
    },
};

/// Wire every domain job against the given test dependencies.
pub fn build_job_runner(
    repo: Arc<dyn BusinessRepo>,
    provider: Arc<dyn DomainHostingProvider>,
    health: Arc<dyn DomainHealthCheck>,
    scheduler: Arc<dyn JobScheduler>,
) -> DomainJobRunner {
    DomainJobRunner::new(
        Arc::new(DomainMonitoringJob::new(
            repo.clone(),
            health.clone(),
            scheduler.clone(),
        )),
        Arc::new(CertificatePropagationRetryJob::new(
            repo.clone(),
            provider.clone(),
            health,
            scheduler.clone(),
        )),
        Arc::new(DomainRebuildContinueJob::new(
            repo,
            provider.clone(),
            scheduler,
        )),
        Arc::new(DomainVerificationJob::new(provider)),
    )
}
