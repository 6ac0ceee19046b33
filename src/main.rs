use dotenvy::dotenv;
use tracing::info;

use cname_monitor::infra::{
    app::create_app,
    config::AppConfig,
    job_worker::{WorkerSettings, run_job_worker_loop},
    setup::{init_app_state, init_tracing},
};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = AppConfig::from_env();
    init_tracing(config.log_format);

    let app_state = init_app_state(config).await?;

    let bind_addr = app_state.config.bind_addr;
    let settings = WorkerSettings {
        poll_interval: app_state.config.job_poll_interval,
        sweep_interval: app_state.config.monitor_sweep_interval,
    };

    let queue = app_state.job_queue.clone();
    let runner = app_state.job_runner.clone();
    tokio::spawn(async move {
        run_job_worker_loop(queue, runner, settings).await;
    });

    let app = create_app(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Monitor listening at {}", &listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
