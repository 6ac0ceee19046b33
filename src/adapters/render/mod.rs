//! Render custom-domain API client.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, error};
use url::Url;

use crate::application::ports::domain_hosting::{
    DomainHostingProvider, RenderApiError, RenderDomain,
};

#[derive(Clone)]
pub struct RenderDomainService {
    http: Client,
    base_url: Url,
    api_key: SecretString,
    service_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomDomainBody {
    id: String,
    name: String,
    #[serde(default)]
    verification_status: Option<String>,
}

/// List responses wrap each domain with a pagination cursor.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomDomainEntry {
    custom_domain: CustomDomainBody,
}

/// Create returns a list of created domains; older API versions return the
/// domain itself.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CreateResponse {
    Many(Vec<CustomDomainBody>),
    One(CustomDomainBody),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl From<CustomDomainBody> for RenderDomain {
    fn from(body: CustomDomainBody) -> Self {
        RenderDomain {
            id: body.id,
            name: body.name,
            verification_status: body.verification_status,
        }
    }
}

impl RenderDomainService {
    pub fn new(http: Client, base_url: Url, api_key: SecretString, service_id: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
            service_id,
        }
    }

    fn url(&self, path: &str) -> Result<Url, RenderApiError> {
        self.base_url
            .join(&format!("services/{}/{}", self.service_id, path))
            .map_err(|e| RenderApiError::Transport(format!("invalid Render URL: {}", e)))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(self.api_key.expose_secret())
            .header("Accept", "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RenderApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| RenderApiError::Transport(e.to_string()))?;
        ensure_success(response).await
    }
}

async fn ensure_success(response: Response) -> Result<Response, RenderApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or(body);
    error!(status = %status, message = %message, "Render API error");

    Err(RenderApiError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, RenderApiError> {
    let body = response
        .text()
        .await
        .map_err(|e| RenderApiError::Transport(e.to_string()))?;
    serde_json::from_str(&body).map_err(|e| RenderApiError::Decode(e.to_string()))
}

#[async_trait]
impl DomainHostingProvider for RenderDomainService {
    async fn find_domain_by_name(&self, name: &str) -> Result<Option<RenderDomain>, RenderApiError> {
        let mut url = self.url("custom-domains")?;
        url.query_pairs_mut().append_pair("name", name);

        let response = self.send(self.request(Method::GET, url)).await?;
        let entries: Vec<CustomDomainEntry> = parse_json(response).await?;

        Ok(entries
            .into_iter()
            .map(|e| e.custom_domain)
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .map(RenderDomain::from))
    }

    async fn add_domain(&self, name: &str) -> Result<RenderDomain, RenderApiError> {
        let url = self.url("custom-domains")?;
        let body = serde_json::json!({ "name": name });

        let response = self.send(self.request(Method::POST, url).json(&body)).await?;
        let created = match parse_json::<CreateResponse>(response).await? {
            CreateResponse::One(domain) => domain,
            CreateResponse::Many(domains) => domains
                .into_iter()
                .find(|d| d.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| RenderApiError::Decode(format!("{} missing from create response", name)))?,
        };

        debug!(domain = %created.name, domain_id = %created.id, "Render custom domain created");
        Ok(created.into())
    }

    async fn remove_domain(&self, domain_id: &str) -> Result<(), RenderApiError> {
        let url = self.url(&format!("custom-domains/{}", domain_id))?;
        self.send(self.request(Method::DELETE, url)).await?;
        debug!(domain_id = %domain_id, "Render custom domain removed");
        Ok(())
    }

    async fn verify_domain(&self, domain_id: &str) -> Result<(), RenderApiError> {
        let url = self.url(&format!("custom-domains/{}/verify", domain_id))?;
        self.send(self.request(Method::POST, url)).await?;
        Ok(())
    }
}
