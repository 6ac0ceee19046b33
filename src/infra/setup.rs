use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{
        health::DomainHealthChecker, http::app_state::AppState, render::RenderDomainService,
    },
    application::ports::{
        domain_hosting::DomainHostingProvider,
        health_check::DomainHealthCheck,
        job_queue::{JobQueueRepo, JobScheduler},
    },
    infra::{
        config::{AppConfig, LogFormat},
        http_client::build_client,
        postgres_persistence,
    },
    use_cases::{
        certificate_retry::CertificatePropagationRetryJob,
        domain_monitoring::{BusinessRepo, DomainMonitoringJob},
        domain_rebuild::DomainRebuildContinueJob,
        domain_verification::DomainVerificationJob,
        job_runner::DomainJobRunner,
    },
};

pub async fn init_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);

    let business_repo = postgres_arc.clone() as Arc<dyn BusinessRepo>;
    let scheduler = postgres_arc.clone() as Arc<dyn JobScheduler>;
    let job_queue = postgres_arc.clone() as Arc<dyn JobQueueRepo>;

    let provider: Arc<dyn DomainHostingProvider> = Arc::new(RenderDomainService::new(
        build_client()?,
        config.render_api_base.clone(),
        config.render_api_key.clone(),
        config.render_service_id.clone(),
    ));

    let health_checker: Arc<dyn DomainHealthCheck> = match config.dns_server {
        Some(addr) => Arc::new(DomainHealthChecker::with_nameserver(
            addr,
            config.health_check_timeout,
        )?),
        None => Arc::new(DomainHealthChecker::new(config.health_check_timeout)?),
    };

    let job_runner = DomainJobRunner::new(
        Arc::new(DomainMonitoringJob::new(
            business_repo.clone(),
            health_checker.clone(),
            scheduler.clone(),
        )),
        Arc::new(CertificatePropagationRetryJob::new(
            business_repo.clone(),
            provider.clone(),
            health_checker,
            scheduler.clone(),
        )),
        Arc::new(DomainRebuildContinueJob::new(
            business_repo.clone(),
            provider.clone(),
            scheduler.clone(),
        )),
        Arc::new(DomainVerificationJob::new(provider)),
    );

    Ok(AppState {
        config: Arc::new(config),
        business_repo,
        scheduler,
        job_queue,
        job_runner: Arc::new(job_runner),
    })
}

pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cname_monitor=info,tower_http=info".into());

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(false).with_level(true).pretty())
            .try_init()
            .ok(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
            .ok(),
    };
}
