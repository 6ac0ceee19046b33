use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    domain::entities::{
        business::{Business, BusinessId, BusinessStatus, HostType},
        domain_job::DomainJob,
        domain_state::DomainState,
    },
    use_cases::{certificate_retry::MAX_RETRY_ATTEMPTS, domain_monitoring::MAX_MONITORING_ATTEMPTS},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/businesses/{business_id}/domain", get(get_domain))
        .route(
            "/businesses/{business_id}/monitoring",
            post(restart_monitoring).delete(stop_monitoring),
        )
        .route("/monitoring/sweep", post(sweep))
        .route(
            "/businesses/{business_id}/certificate-retry",
            post(start_certificate_retry),
        )
        .route("/businesses/{business_id}/rebuild", post(start_rebuild))
}

#[derive(Serialize)]
struct DomainSnapshot {
    business_id: BusinessId,
    hostname: Option<String>,
    host_type: HostType,
    status: BusinessStatus,
    state: DomainState,
    attempts: i32,
    max_attempts: i32,
    monitoring_active: bool,
    render_domain_added: bool,
    last_checked_at: Option<NaiveDateTime>,
}

impl From<&Business> for DomainSnapshot {
    fn from(business: &Business) -> Self {
        DomainSnapshot {
            business_id: business.id,
            hostname: business.hostname.clone(),
            host_type: business.host_type,
            status: business.status,
            state: DomainState::from_business(business),
            attempts: business.cname_check_attempts,
            max_attempts: MAX_MONITORING_ATTEMPTS,
            monitoring_active: business.cname_monitoring_active,
            render_domain_added: business.render_domain_added,
            last_checked_at: business.cname_last_checked_at,
        }
    }
}

#[derive(Serialize)]
struct EnqueuedResponse {
    /// `None` when an equivalent job was already queued or running.
    job_id: Option<Uuid>,
}

#[derive(Deserialize)]
struct CertificateRetryPayload {
    #[serde(default)]
    retry_count: i32,
}

async fn load_business(app_state: &AppState, business_id: BusinessId) -> AppResult<Business> {
    app_state
        .business_repo
        .get_by_id(business_id)
        .await?
        .ok_or(AppError::NotFound)
}

async fn get_domain(
    State(app_state): State<AppState>,
    Path(business_id): Path<BusinessId>,
) -> AppResult<impl IntoResponse> {
    let business = load_business(&app_state, business_id).await?;
    Ok(Json(DomainSnapshot::from(&business)))
}

async fn restart_monitoring(
    State(app_state): State<AppState>,
    Path(business_id): Path<BusinessId>,
) -> AppResult<impl IntoResponse> {
    let business = app_state
        .job_runner
        .monitoring()
        .restart_monitoring(business_id)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(DomainSnapshot::from(&business))))
}

async fn stop_monitoring(
    State(app_state): State<AppState>,
    Path(business_id): Path<BusinessId>,
) -> AppResult<impl IntoResponse> {
    app_state
        .job_runner
        .monitoring()
        .stop_monitoring(business_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn sweep(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    let enqueued = app_state.job_runner.monitoring().monitor_all_pending().await?;
    Ok(Json(serde_json::json!({ "enqueued": enqueued })))
}

async fn start_certificate_retry(
    State(app_state): State<AppState>,
    Path(business_id): Path<BusinessId>,
    payload: Option<Json<CertificateRetryPayload>>,
) -> AppResult<impl IntoResponse> {
    let retry_count = payload.map(|Json(p)| p.retry_count).unwrap_or(0);
    if !(0..MAX_RETRY_ATTEMPTS).contains(&retry_count) {
        return Err(AppError::InvalidInput(format!(
            "retry_count must be between 0 and {}",
            MAX_RETRY_ATTEMPTS - 1
        )));
    }

    load_business(&app_state, business_id).await?;

    let job_id = app_state
        .scheduler
        .enqueue_if_idle(
            DomainJob::CertificatePropagationRetry {
                business_id,
                retry_count,
            },
            Duration::ZERO,
        )
        .await?;
    Ok((StatusCode::ACCEPTED, Json(EnqueuedResponse { job_id })))
}

async fn start_rebuild(
    State(app_state): State<AppState>,
    Path(business_id): Path<BusinessId>,
) -> AppResult<impl IntoResponse> {
    let business = load_business(&app_state, business_id).await?;
    if !business.is_custom_domain() || business.custom_hostname().is_none() {
        return Err(AppError::InvalidInput(
            "Rebuild is only available for businesses with a custom domain".into(),
        ));
    }

    let job_id = app_state
        .scheduler
        .enqueue(DomainJob::DomainRebuildContinue { business_id }, Duration::ZERO)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(EnqueuedResponse { job_id })))
}
