use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Failures talking to the hosting provider's custom-domain API.
#[derive(Debug, Error)]
pub enum RenderApiError {
    #[error("Render request failed: {0}")]
    Transport(String),

    #[error("Render API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Render response could not be parsed: {0}")]
    Decode(String),
}

impl RenderApiError {
    /// The domain already exists at the provider.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RenderApiError::Api { status: 409, .. })
    }
}

/// A custom domain as registered at the hosting provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderDomain {
    pub id: String,
    pub name: String,
    pub verification_status: Option<String>,
}

/// Custom-domain management at the hosting provider.
#[async_trait]
pub trait DomainHostingProvider: Send + Sync {
    async fn find_domain_by_name(&self, name: &str) -> Result<Option<RenderDomain>, RenderApiError>;
    async fn add_domain(&self, name: &str) -> Result<RenderDomain, RenderApiError>;
    async fn remove_domain(&self, domain_id: &str) -> Result<(), RenderApiError>;
    async fn verify_domain(&self, domain_id: &str) -> Result<(), RenderApiError>;
}
