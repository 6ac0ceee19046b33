use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    application::ports::job_queue::{JobQueueRepo, JobScheduler},
    infra::config::AppConfig,
    use_cases::{domain_monitoring::BusinessRepo, job_runner::DomainJobRunner},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub business_repo: Arc<dyn BusinessRepo>,
    pub scheduler: Arc<dyn JobScheduler>,
    pub job_queue: Arc<dyn JobQueueRepo>,
    pub job_runner: Arc<DomainJobRunner>,
}

impl FromRef<AppState> for Arc<DomainJobRunner> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.job_runner.clone()
    }
}
