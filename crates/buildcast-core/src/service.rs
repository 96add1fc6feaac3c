//! Service trait definitions
//!
//! - `DashboardService`: the four calls one endpoint supports
//! - `ServiceFactory`: builds a `DashboardService` per resolved endpoint
//!
//! Both are backend-agnostic. The reqwest implementation lives in
//! `buildcast-client`; scripted fakes live in [`crate::fakes`].

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::PublisherConfig;
use crate::endpoint::Endpoint;
use crate::error::ClientResult;
use crate::request::{BuildDataCreateRequest, CodeQualityCreateRequest, GenericItemCreateRequest};

/// Status returned by the dashboard on a successful create.
pub const STATUS_CREATED: u16 = 201;

/// Status returned by the build runtime on a successful read.
pub const STATUS_OK: u16 = 200;

/// Uniform answer from any service call: status plus raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResponse {
    pub status_code: u16,
    pub body: String,
}

impl ServiceResponse {
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }

    pub fn is_created(&self) -> bool {
        self.status_code == STATUS_CREATED
    }

    pub fn is_ok(&self) -> bool {
        self.status_code == STATUS_OK
    }
}

impl std::fmt::Display for ServiceResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Response Code: {}. Response Value= {}",
            self.status_code, self.body
        )
    }
}

/// Basic-auth credentials for the build runtime's own API.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuntimeCredentials {
    pub user_id: String,
    pub token: String,
}

/// Transport for one dashboard endpoint.
///
/// Calls have no retry. Any `Err` or unexpected status is final for that call.
#[async_trait]
pub trait DashboardService: Send + Sync {
    /// Base URL this service talks to.
    fn service_url(&self) -> &str;

    async fn publish_build(&self, request: &BuildDataCreateRequest)
        -> ClientResult<ServiceResponse>;

    async fn publish_code_quality(
        &self,
        request: &CodeQualityCreateRequest,
    ) -> ClientResult<ServiceResponse>;

    async fn publish_generic_item(
        &self,
        request: &GenericItemCreateRequest,
    ) -> ClientResult<ServiceResponse>;

    /// GET a build-runtime API URL with basic auth.
    async fn fetch_stage_data(
        &self,
        url: &str,
        credentials: &RuntimeCredentials,
    ) -> ClientResult<ServiceResponse>;
}

/// Creates the transport for each endpoint of a fan-out.
pub trait ServiceFactory: Send + Sync {
    fn service_for(
        &self,
        endpoint: &Endpoint,
        config: &PublisherConfig,
    ) -> ClientResult<Arc<dyn DashboardService>>;
}
