//! reqwest-backed dashboard service.

use async_trait::async_trait;
use buildcast_core::{
    BuildDataCreateRequest, ClientError, ClientResult, CodeQualityCreateRequest, DashboardService,
    Endpoint, GenericItemCreateRequest, PublisherConfig, RuntimeCredentials, ServiceFactory,
    ServiceResponse,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const BUILD_PATH: &str = "/v3/build";
const QUALITY_PATH: &str = "/quality/static-analysis";
const GENERIC_ITEM_PATH: &str = "/generic-item";

/// Settings for one endpoint's HTTP client.
#[derive(Debug, Clone)]
pub struct HttpServiceConfig {
    pub service_url: String,
    /// Sent as `Authorization: apiToken {token}` when present
    pub api_token: Option<String>,
    /// Sent as the `apiUser` header
    pub instance_name: String,
    /// When false, environment proxy settings are ignored
    pub use_proxy: bool,
    pub timeout: Duration,
}

impl HttpServiceConfig {
    pub fn new(service_url: &str) -> Self {
        HttpServiceConfig {
            service_url: service_url.to_string(),
            api_token: None,
            instance_name: String::new(),
            use_proxy: false,
            timeout: Duration::from_secs(30),
        }
    }

    /// Derive endpoint settings from the publisher configuration.
    pub fn for_endpoint(endpoint: &Endpoint, config: &PublisherConfig) -> Self {
        HttpServiceConfig {
            service_url: endpoint.service_url.clone(),
            api_token: config.api_token.clone().filter(|t| !t.is_empty()),
            instance_name: config.instance_name.clone(),
            use_proxy: config.use_proxy,
            timeout: config.request_timeout(),
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.api_token = Some(token.to_string());
        self
    }

    pub fn with_instance_name(mut self, name: &str) -> Self {
        self.instance_name = name.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Dashboard service client for a single endpoint.
pub struct HttpDashboardService {
    config: HttpServiceConfig,
    http_client: reqwest::Client,
}

impl HttpDashboardService {
    pub fn new(config: HttpServiceConfig) -> ClientResult<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("buildcast/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout);
        if !config.use_proxy {
            builder = builder.no_proxy();
        }
        let http_client = builder
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(HttpDashboardService {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.service_url.trim_end_matches('/'), path)
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> ClientResult<ServiceResponse> {
        let url = self.url(path);
        let payload = serde_json::to_vec(body).map_err(|e| ClientError::Encode(e.to_string()))?;

        let mut request = self
            .http_client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("apiUser", &self.config.instance_name)
            .body(payload);
        if let Some(token) = &self.config.api_token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("apiToken {token}"));
        }

        debug!(url = %url, "POST");
        let response = request.send().await.map_err(|e| ClientError::Transport {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        read_response(&url, response).await
    }
}

async fn read_response(url: &str, response: reqwest::Response) -> ClientResult<ServiceResponse> {
    let status_code = response.status().as_u16();
    let body = response.text().await.map_err(|e| ClientError::Body {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    debug!(url = %url, status = status_code, "Response received");
    Ok(ServiceResponse::new(status_code, body))
}

#[async_trait]
impl DashboardService for HttpDashboardService {
    fn service_url(&self) -> &str {
        &self.config.service_url
    }

    async fn publish_build(
        &self,
        request: &BuildDataCreateRequest,
    ) -> ClientResult<ServiceResponse> {
        self.post_json(BUILD_PATH, request).await
    }

    async fn publish_code_quality(
        &self,
        request: &CodeQualityCreateRequest,
    ) -> ClientResult<ServiceResponse> {
        self.post_json(QUALITY_PATH, request).await
    }

    async fn publish_generic_item(
        &self,
        request: &GenericItemCreateRequest,
    ) -> ClientResult<ServiceResponse> {
        self.post_json(GENERIC_ITEM_PATH, request).await
    }

    async fn fetch_stage_data(
        &self,
        url: &str,
        credentials: &RuntimeCredentials,
    ) -> ClientResult<ServiceResponse> {
        let mut request = self.http_client.get(url);
        if !credentials.user_id.is_empty() {
            request = request.basic_auth(&credentials.user_id, Some(&credentials.token));
        }

        debug!(url = %url, "GET");
        let response = request.send().await.map_err(|e| ClientError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        read_response(url, response).await
    }
}

/// Builds an [`HttpDashboardService`] for each endpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpServiceFactory;

impl ServiceFactory for HttpServiceFactory {
    fn service_for(
        &self,
        endpoint: &Endpoint,
        config: &PublisherConfig,
    ) -> ClientResult<Arc<dyn DashboardService>> {
        let service = HttpDashboardService::new(HttpServiceConfig::for_endpoint(endpoint, config))?;
        Ok(Arc::new(service))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_for_endpoint() {
        let endpoint = Endpoint {
            service_url: "http://dash/api".to_string(),
            dashboard_url: None,
            index: 0,
        };
        let config = PublisherConfig {
            api_token: Some(String::new()),
            instance_name: "ci-main".to_string(),
            use_proxy: true,
            request_timeout_secs: 5,
            ..PublisherConfig::default()
        };

        let http = HttpServiceConfig::for_endpoint(&endpoint, &config);
        assert_eq!(http.service_url, "http://dash/api");
        assert!(http.api_token.is_none(), "empty token is not sent");
        assert!(http.use_proxy);
        assert_eq!(http.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_url_join() {
        let service =
            HttpDashboardService::new(HttpServiceConfig::new("http://dash/api/")).expect("client");
        assert_eq!(service.url(BUILD_PATH), "http://dash/api/v3/build");
    }
}
