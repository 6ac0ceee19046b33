use std::net::SocketAddr;
use std::time::Duration;

use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    /// Bearer token guarding the operations API.
    pub ops_api_token: SecretString,
    pub render_api_key: SecretString,
    /// Render service that owns the custom domains.
    pub render_service_id: String,
    pub render_api_base: Url,
    /// Optional DNS server address for health-check lookups (e.g., "127.0.0.1:5353").
    pub dns_server: Option<SocketAddr>,
    pub health_check_timeout: Duration,
    pub job_poll_interval: Duration,
    pub monitor_sweep_interval: Duration,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3002".parse().unwrap());
        let database_url: String = get_env("DATABASE_URL");
        let ops_api_token = SecretString::new(get_env::<String>("OPS_API_TOKEN").into());
        let render_api_key = SecretString::new(get_env::<String>("RENDER_API_KEY").into());
        let render_service_id: String = get_env("RENDER_SERVICE_ID");
        let render_api_base = normalize_base(get_env_default(
            "RENDER_API_BASE",
            "https://api.render.com/v1/".parse().unwrap(),
        ));
        let dns_server: Option<SocketAddr> = std::env::var("DNS_SERVER")
            .ok()
            .and_then(|s| s.parse().ok());
        let health_check_timeout_secs: u64 = get_env_default("HEALTH_CHECK_TIMEOUT_SECS", 10);
        let job_poll_interval_secs: u64 = get_env_default("JOB_POLL_INTERVAL_SECS", 5);
        let monitor_sweep_interval_secs: u64 = get_env_default("MONITOR_SWEEP_INTERVAL_SECS", 300);
        let log_format = LogFormat::from_str(&get_env_default("LOG_FORMAT", String::from("pretty")));

        Self {
            bind_addr,
            database_url,
            ops_api_token,
            render_api_key,
            render_service_id,
            render_api_base,
            dns_server,
            health_check_timeout: Duration::from_secs(health_check_timeout_secs.max(1)),
            job_poll_interval: Duration::from_secs(job_poll_interval_secs.max(1)),
            monitor_sweep_interval: Duration::from_secs(monitor_sweep_interval_secs.max(1)),
            log_format,
        }
    }
}

/// `Url::join` drops the last path segment unless the base ends with a slash.
fn normalize_base(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}
