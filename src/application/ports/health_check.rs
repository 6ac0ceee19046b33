use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub ssl_ready: bool,
}

impl HealthStatus {
    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn is_verified(&self) -> bool {
        self.healthy && self.ssl_ready
    }
}

/// Reachability probe for a hostname. Implementations never fail: any probe
/// error is reported as an unhealthy status.
#[async_trait]
pub trait DomainHealthCheck: Send + Sync {
    async fn check_health(&self, hostname: &str) -> HealthStatus;
}
