use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::TokioResolver;
use hickory_resolver::config::{NameServerConfig, ResolverConfig};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::xfer::Protocol;
use reqwest::{Client, redirect::Policy};
use tracing::debug;

use crate::application::ports::health_check::{DomainHealthCheck, HealthStatus};
use crate::infra::http_client::DEFAULT_CONNECT_TIMEOUT;

/// Probes a custom hostname: DNS, then HTTPS, then plain HTTP.
pub struct DomainHealthChecker {
    resolver: TokioResolver,
    http: Client,
}

impl DomainHealthChecker {
    /// Create a checker using the system DNS configuration.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let resolver = TokioResolver::builder_tokio()?.build();
        Ok(Self {
            resolver,
            http: probe_client(timeout)?,
        })
    }

    /// Create a checker resolving through a specific DNS server.
    pub fn with_nameserver(addr: SocketAddr, timeout: Duration) -> anyhow::Result<Self> {
        let mut config = ResolverConfig::new();
        config.add_name_server(NameServerConfig::new(addr, Protocol::Udp));

        let resolver =
            TokioResolver::builder_with_config(config, TokioConnectionProvider::default()).build();
        Ok(Self {
            resolver,
            http: probe_client(timeout)?,
        })
    }

    async fn resolves(&self, hostname: &str) -> bool {
        // Trailing dot prevents search domain appending
        let fqdn = format!("{}.", hostname.trim_end_matches('.'));
        match self.resolver.lookup_ip(fqdn).await {
            Ok(lookup) => lookup.iter().next().is_some(),
            Err(e) => {
                debug!(domain = %hostname, error = %e, "DNS lookup failed");
                false
            }
        }
    }

    async fn probe(&self, url: &str) -> Result<reqwest::StatusCode, reqwest::Error> {
        self.http.get(url).send().await.map(|r| r.status())
    }
}

/// Redirects are not followed: a redirect still proves the host answered.
fn probe_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .redirect(Policy::none())
        .build()
}

/// Outcome of the HTTPS probe and, when it failed, the HTTP fallback.
fn classify(
    https: Result<reqwest::StatusCode, ()>,
    http: Option<Result<reqwest::StatusCode, ()>>,
) -> HealthStatus {
    match (https, http) {
        (Ok(status), _) => HealthStatus {
            healthy: !status.is_server_error(),
            ssl_ready: true,
        },
        (Err(()), Some(Ok(status))) => HealthStatus {
            healthy: !status.is_server_error(),
            ssl_ready: false,
        },
        _ => HealthStatus::unreachable(),
    }
}

#[async_trait]
impl DomainHealthCheck for DomainHealthChecker {
    async fn check_health(&self, hostname: &str) -> HealthStatus {
        let hostname = hostname.trim().trim_end_matches('.');
        if hostname.is_empty() || !self.resolves(hostname).await {
            return HealthStatus::unreachable();
        }

        let https = self
            .probe(&format!("https://{}/", hostname))
            .await
            .map_err(|e| debug!(domain = %hostname, error = %e, "HTTPS probe failed"));

        let http = match https {
            Ok(_) => None,
            Err(()) => Some(
                self.probe(&format!("http://{}/", hostname))
                    .await
                    .map_err(|e| debug!(domain = %hostname, error = %e, "HTTP probe failed")),
            ),
        };

        let status = classify(https, http);
        debug!(
            domain = %hostname,
            healthy = status.healthy,
            ssl_ready = status.ssl_ready,
            "Health check complete"
        );
        status
    }
}
