//! Fakes for the hosting provider and the health probe.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::application::ports::{
    domain_hosting::{DomainHostingProvider, RenderApiError, RenderDomain},
    health_check::{DomainHealthCheck, HealthStatus},
};

/// A call received by [`FakeDomainProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Find(String),
    Add(String),
    Remove(String),
    Verify(String),
}

/// In-memory custom-domain registry. Domain ids are derived from the name
/// (`cdm-www-example-com`), so `id_of` works before and after removal.
#[derive(Default)]
pub struct FakeDomainProvider {
    domains: Mutex<Vec<RenderDomain>>,
    calls: Mutex<Vec<ProviderCall>>,
    fail_add: bool,
    fail_remove: bool,
    fail_verify: bool,
}

impl FakeDomainProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domains(names: &[&str]) -> Self {
        let domains = names
            .iter()
            .map(|name| RenderDomain {
                id: domain_id(name),
                name: name.to_string(),
                verification_status: Some("unverified".to_string()),
            })
            .collect();
        Self {
            domains: Mutex::new(domains),
            ..Self::default()
        }
    }

    pub fn failing_add(mut self) -> Self {
        self.fail_add = true;
        self
    }

    pub fn failing_remove(mut self) -> Self {
        self.fail_remove = true;
        self
    }

    pub fn failing_verify(mut self) -> Self {
        self.fail_verify = true;
        self
    }

    /// Provider id for a domain name, registered or not.
    pub fn id_of(&self, name: &str) -> Option<String> {
        Some(domain_id(name))
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn add_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ProviderCall::Add(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn remove_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ProviderCall::Remove(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn verify_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ProviderCall::Verify(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn registered(&self) -> Vec<String> {
        self.domains
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.name.clone())
            .collect()
    }

    fn record(&self, call: ProviderCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn unavailable() -> RenderApiError {
        RenderApiError::Api {
            status: 503,
            message: "service unavailable".into(),
        }
    }
}

fn domain_id(name: &str) -> String {
    format!("cdm-{}", name.to_lowercase().replace('.', "-"))
}

#[async_trait]
impl DomainHostingProvider for FakeDomainProvider {
    async fn find_domain_by_name(&self, name: &str) -> Result<Option<RenderDomain>, RenderApiError> {
        self.record(ProviderCall::Find(name.to_string()));
        Ok(self
            .domains
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn add_domain(&self, name: &str) -> Result<RenderDomain, RenderApiError> {
        self.record(ProviderCall::Add(name.to_string()));
        if self.fail_add {
            return Err(Self::unavailable());
        }

        let mut domains = self.domains.lock().unwrap();
        if domains.iter().any(|d| d.name.eq_ignore_ascii_case(name)) {
            return Err(RenderApiError::Api {
                status: 409,
                message: "custom domain already exists".into(),
            });
        }
        let domain = RenderDomain {
            id: domain_id(name),
            name: name.to_string(),
            verification_status: Some("unverified".to_string()),
        };
        domains.push(domain.clone());
        Ok(domain)
    }

    async fn remove_domain(&self, domain_id: &str) -> Result<(), RenderApiError> {
        self.record(ProviderCall::Remove(domain_id.to_string()));
        if self.fail_remove {
            return Err(Self::unavailable());
        }
        self.domains.lock().unwrap().retain(|d| d.id != domain_id);
        Ok(())
    }

    async fn verify_domain(&self, domain_id: &str) -> Result<(), RenderApiError> {
        self.record(ProviderCall::Verify(domain_id.to_string()));
        if self.fail_verify {
            return Err(Self::unavailable());
        }
        Ok(())
    }
}

/// Health probe returning canned statuses. Queued statuses are returned
/// first, then the default.
pub struct StubHealthChecker {
    default: HealthStatus,
    queued: Mutex<VecDeque<HealthStatus>>,
    calls: Mutex<Vec<String>>,
}

impl StubHealthChecker {
    pub fn new(default: HealthStatus) -> Self {
        Self {
            default,
            queued: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_sequence(statuses: Vec<HealthStatus>, default: HealthStatus) -> Self {
        Self {
            queued: Mutex::new(statuses.into()),
            ..Self::new(default)
        }
    }

    /// Hostnames probed, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DomainHealthCheck for StubHealthChecker {
    async fn check_health(&self, hostname: &str) -> HealthStatus {
        self.calls.lock().unwrap().push(hostname.to_string());
        self.queued.lock().unwrap().pop_front().unwrap_or(self.default)
    }
}
