//! Build record publishing and reference pair extraction.

use buildcast_core::{
    BuildDataCreateRequest, BuildDataCreateResponse, DashboardService, Endpoint, ReferencePair,
    ServiceResponse,
};

use crate::error::{PublishCall, PublishError};

/// Outcome of a created build record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPublication {
    pub reference: ReferencePair,
    /// Deep link to the dashboard showing this build, if one can be built
    pub dashboard_link: Option<String>,
    pub response: ServiceResponse,
}

impl BuildPublication {
    pub fn correlation_token(&self) -> String {
        self.reference.correlation_token()
    }
}

/// Submits build records to one endpoint.
pub struct BuildPublisher<'a> {
    service: &'a dyn DashboardService,
    endpoint: &'a Endpoint,
}

impl<'a> BuildPublisher<'a> {
    pub fn new(service: &'a dyn DashboardService, endpoint: &'a Endpoint) -> Self {
        Self { service, endpoint }
    }

    /// Send `request` and parse the reference pair out of a `201` answer.
    ///
    /// Any other status, a transport error, or an unreadable body yields an
    /// error and no reference.
    pub async fn publish(
        &self,
        request: &BuildDataCreateRequest,
    ) -> Result<BuildPublication, PublishError> {
        let response = self
            .service
            .publish_build(request)
            .await
            .map_err(|source| PublishError::Transport {
                call: PublishCall::Build,
                source,
            })?;

        if !response.is_created() {
            return Err(PublishError::Rejected {
                call: PublishCall::Build,
                response,
            });
        }

        let created: BuildDataCreateResponse =
            serde_json::from_str(&response.body).map_err(|source| PublishError::Parse {
                call: PublishCall::Build,
                source,
            })?;

        let dashboard_link = created
            .dashboard_id
            .as_deref()
            .and_then(|id| self.endpoint.dashboard_link(id));

        Ok(BuildPublication {
            reference: ReferencePair::from(&created),
            dashboard_link,
            response,
        })
    }
}
