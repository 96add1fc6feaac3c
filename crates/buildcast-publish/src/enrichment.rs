//! Stage enrichment for pipeline builds.
//!
//! Three sequential phases against the build runtime's API:
//! 1. discovery: `GET {build_url}/wfapi/describe` for the flat stage list
//! 2. node links: `GET` each stage's self link to find its log location
//! 3. log capture: `GET` the log of each failed stage, when enabled
//!
//! Every phase is a no-op on an empty stage list. The first error aborts the
//! remaining phases; stages already filled in keep their data.

use buildcast_core::stage::{parse_node_log_href, parse_stage_list};
use buildcast_core::{
    resolve_href, BuildEventContext, DashboardService, PublisherConfig, RuntimeCredentials, Stage,
};
use tracing::debug;

use crate::error::{EnrichmentError, EnrichmentPhase};

/// Suffix appended to a build URL to describe its stages.
pub const DESCRIBE_SUFFIX: &str = "/wfapi/describe";

pub type EnrichmentResult<T> = std::result::Result<T, EnrichmentError>;

pub struct StageEnricher<'a> {
    service: &'a dyn DashboardService,
    credentials: RuntimeCredentials,
    capture_logs: bool,
}

impl<'a> StageEnricher<'a> {
    pub fn new(service: &'a dyn DashboardService, config: &PublisherConfig) -> Self {
        Self {
            service,
            credentials: config.runtime_credentials(),
            capture_logs: config.capture_failure_logs,
        }
    }

    /// Run all phases, filling `stages` in place.
    ///
    /// Builds without stage support leave `stages` untouched and succeed.
    pub async fn enrich(
        &self,
        ctx: &BuildEventContext,
        stages: &mut Vec<Stage>,
    ) -> EnrichmentResult<()> {
        if !ctx.kind.has_stages() {
            debug!(build_url = %ctx.build_url, "Build has no stages, skipping enrichment");
            return Ok(());
        }

        *stages = self.discover_stages(ctx).await?;
        if stages.is_empty() {
            return Ok(());
        }

        self.resolve_node_links(ctx, stages).await?;
        self.capture_failure_logs(ctx, stages).await
    }

    pub async fn discover_stages(&self, ctx: &BuildEventContext) -> EnrichmentResult<Vec<Stage>> {
        let url = describe_url(&ctx.build_url);
        let body = self.get(EnrichmentPhase::Discovery, &url).await?;
        let stages = parse_stage_list(&body).map_err(|source| EnrichmentError::Parse {
            phase: EnrichmentPhase::Discovery,
            url,
            source,
        })?;
        debug!(count = stages.len(), "Discovered stages");
        Ok(stages)
    }

    /// Populate `exec_node_log_url` for every stage, in order.
    pub async fn resolve_node_links(
        &self,
        ctx: &BuildEventContext,
        stages: &mut [Stage],
    ) -> EnrichmentResult<()> {
        for stage in stages.iter_mut() {
            let href = stage
                .self_href()
                .ok_or_else(|| EnrichmentError::MissingSelfLink {
                    stage: stage.name.clone(),
                })?;
            let url = resolve_href(&ctx.instance_url, href);
            let body = self.get(EnrichmentPhase::NodeLinks, &url).await?;
            stage.exec_node_log_url =
                parse_node_log_href(&body).map_err(|source| EnrichmentError::Parse {
                    phase: EnrichmentPhase::NodeLinks,
                    url,
                    source,
                })?;
        }
        Ok(())
    }

    /// Store the raw log text of failed stages. Does nothing unless log
    /// capture is enabled.
    pub async fn capture_failure_logs(
        &self,
        ctx: &BuildEventContext,
        stages: &mut [Stage],
    ) -> EnrichmentResult<()> {
        if !self.capture_logs {
            return Ok(());
        }
        for stage in stages.iter_mut().filter(|s| s.status.is_failed()) {
            let href =
                stage
                    .exec_node_log_url
                    .as_deref()
                    .ok_or_else(|| EnrichmentError::MissingLogLink {
                        stage: stage.name.clone(),
                    })?;
            let url = resolve_href(&ctx.instance_url, href);
            stage.log = Some(self.get(EnrichmentPhase::LogCapture, &url).await?);
        }
        Ok(())
    }

    async fn get(&self, phase: EnrichmentPhase, url: &str) -> EnrichmentResult<String> {
        let response = self
            .service
            .fetch_stage_data(url, &self.credentials)
            .await
            .map_err(|source| EnrichmentError::Transport {
                phase,
                url: url.to_string(),
                source,
            })?;
        if !response.is_ok() {
            return Err(EnrichmentError::UnexpectedStatus {
                phase,
                url: url.to_string(),
                status: response.status_code,
            });
        }
        Ok(response.body)
    }
}

pub fn describe_url(build_url: &str) -> String {
    format!("{}{}", build_url.trim_end_matches('/'), DESCRIBE_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_url() {
        assert_eq!(
            describe_url("http://ci/job/svc/12/"),
            "http://ci/job/svc/12/wfapi/describe"
        );
        assert_eq!(
            describe_url("http://ci/job/svc/12"),
            "http://ci/job/svc/12/wfapi/describe"
        );
    }
}
