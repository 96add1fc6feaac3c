//! Build event orchestration.
//!
//! The [`Orchestrator`] reacts to start and completion events and drives the
//! publishers once per configured endpoint, strictly in configured order.
//! Nothing here fails: every problem ends up as a console line plus a
//! structured `tracing` event.

use async_trait::async_trait;
use buildcast_core::{
    BuildDataCreateRequest, BuildEventContext, ConsoleSink, DashboardService, Endpoint,
    EventPhase, PublisherConfig, ServiceFactory, Stage, VERSION,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, Instrument};

use crate::build_publisher::{BuildPublication, BuildPublisher};
use crate::enrichment::StageEnricher;
use crate::error::PublishError;
use crate::extract::{
    ArtifactExtractor, ConsoleQualityExtractor, QualityExtractor, WorkspaceArtifactExtractor,
};
use crate::generic::{GenericItemPublisher, GenericItemReport, GenericTags};
use crate::obs;
use crate::quality::{QualityOutcome, QualityPublisher};

/// Prefix of every console line written by the orchestrator.
pub const CONSOLE_PREFIX: &str = "buildcast: ";

/// Receiver of build lifecycle notifications.
///
/// Both methods are safe to call whatever the configuration says; they never
/// fail and never change the build.
#[async_trait]
pub trait BuildListener: Send + Sync {
    async fn on_build_started(&self, ctx: &BuildEventContext, console: &dyn ConsoleSink);
    async fn on_build_completed(&self, ctx: &BuildEventContext, console: &dyn ConsoleSink);
}

pub struct Orchestrator {
    config: PublisherConfig,
    factory: Arc<dyn ServiceFactory>,
    quality: Arc<dyn QualityExtractor>,
    artifacts: Arc<dyn ArtifactExtractor>,
}

impl Orchestrator {
    /// Create an orchestrator using the console and workspace extractors.
    pub fn new(config: PublisherConfig, factory: Arc<dyn ServiceFactory>) -> Self {
        Self {
            config,
            factory,
            quality: Arc::new(ConsoleQualityExtractor),
            artifacts: Arc::new(WorkspaceArtifactExtractor),
        }
    }

    pub fn with_quality_extractor(mut self, extractor: Arc<dyn QualityExtractor>) -> Self {
        self.quality = extractor;
        self
    }

    pub fn with_artifact_extractor(mut self, extractor: Arc<dyn ArtifactExtractor>) -> Self {
        self.artifacts = extractor;
        self
    }

    fn say(&self, console: &dyn ConsoleSink, line: &str) {
        if self.config.show_console_output {
            console.println(&format!("{CONSOLE_PREFIX}{line}"));
        }
    }

    fn skip(
        &self,
        console: &dyn ConsoleSink,
        phase: EventPhase,
        ctx: &BuildEventContext,
        reason: &str,
    ) {
        self.say(console, &format!("Skipping automatic publish as {reason}."));
        obs::emit_event_skipped(phase, &ctx.job_name, reason);
    }

    fn service(
        &self,
        endpoint: &Endpoint,
        console: &dyn ConsoleSink,
    ) -> Option<Arc<dyn DashboardService>> {
        match self.factory.service_for(endpoint, &self.config) {
            Ok(service) => Some(service),
            Err(e) => {
                self.say(
                    console,
                    &format!("Failed creating a client for {}. {e}", endpoint.service_url),
                );
                obs::emit_publish_failed(&endpoint.service_url, "client", &e);
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Start
    // -----------------------------------------------------------------------

    async fn start_endpoint(
        &self,
        ctx: &BuildEventContext,
        endpoint: &Endpoint,
        console: &dyn ConsoleSink,
    ) {
        let Some(service) = self.service(endpoint, console) else {
            return;
        };

        let request = BuildDataCreateRequest::started(ctx, &self.config.instance_name);
        let Some(publication) = self
            .send_build(service.as_ref(), endpoint, &request, "start", console)
            .await
        else {
            info!(service_url = %endpoint.service_url, "No build record, skipping start items");
            return;
        };
        let token = publication.correlation_token();

        let items = self.config.generic_items_for(EventPhase::Started);
        if items.is_empty() {
            return;
        }
        let tags = GenericTags {
            client_reference: None,
            build_url: ctx.build_url.clone(),
        };
        let reports = GenericItemPublisher::new(service.as_ref(), self.artifacts.as_ref())
            .publish(ctx, &items, Some(token.as_str()), &tags)
            .await;
        self.report_generic(console, endpoint, &reports);
    }

    // -----------------------------------------------------------------------
    // Completion
    // -----------------------------------------------------------------------

    async fn complete_endpoint(
        &self,
        ctx: &BuildEventContext,
        endpoint: &Endpoint,
        console: &dyn ConsoleSink,
    ) {
        let Some(service) = self.service(endpoint, console) else {
            return;
        };
        let service = service.as_ref();

        let stages = self.enrich(ctx, service, console).await;
        let started_by = ctx.triggering_user.clone();
        self.say(
            console,
            &format!(
                "This build was initiated by {}",
                started_by.as_deref().unwrap_or("unknown")
            ),
        );
        let request =
            BuildDataCreateRequest::completed(ctx, &self.config.instance_name, stages, started_by);
        let Some(publication) = self
            .send_build(service, endpoint, &request, "complete", console)
            .await
        else {
            info!(
                service_url = %endpoint.service_url,
                "No build record, skipping quality and generic items"
            );
            return;
        };
        let token = publication.correlation_token();
        let reference = &publication.reference;

        if self.config.publish_quality_data {
            let publisher = QualityPublisher::new(
                service,
                self.quality.as_ref(),
                &self.config.instance_name,
                self.config.use_proxy,
            );
            match publisher.publish(ctx, Some(token.as_str()), Some(reference)).await {
                Ok(QualityOutcome::Published(response)) => {
                    self.say(console, &format!("Published code quality data. {response}"));
                    obs::emit_item_published(
                        &endpoint.service_url,
                        "code_quality",
                        response.status_code,
                    );
                }
                Ok(QualityOutcome::NothingToPublish) => {
                    self.say(console, "Code quality result. Nothing to publish");
                }
                Err(e) => {
                    self.say(console, &format!("Failed publishing code quality data. {e}"));
                    obs::emit_publish_failed(&endpoint.service_url, "code_quality", &e);
                }
            }
        }

        let items = self.config.generic_items_for(EventPhase::Completed);
        if !items.is_empty() {
            let tags = GenericTags {
                client_reference: reference.client_reference.clone(),
                build_url: reference.build_url.clone().unwrap_or_default(),
            };
            let reports = GenericItemPublisher::new(service, self.artifacts.as_ref())
                .publish(ctx, &items, Some(token.as_str()), &tags)
                .await;
            self.report_generic(console, endpoint, &reports);
        }

        if let Some(link) = publication.dashboard_link.as_deref() {
            self.say(
                console,
                &format!(
                    "Link to the dashboard for API endpoint {} - {link}",
                    endpoint.ordinal()
                ),
            );
        }
    }

    /// Run stage enrichment. A failure keeps whatever stages were filled in.
    async fn enrich(
        &self,
        ctx: &BuildEventContext,
        service: &dyn DashboardService,
        console: &dyn ConsoleSink,
    ) -> Vec<Stage> {
        let mut stages = Vec::new();
        if let Err(e) = StageEnricher::new(service, &self.config)
            .enrich(ctx, &mut stages)
            .await
        {
            let cause = e.root_cause();
            self.say(console, &format!("Cause for build runtime API call failure: {cause}"));
            obs::emit_enrichment_failed(&ctx.build_url, &cause, stages.len());
        }
        stages
    }

    /// Send one build record. `None` means downstream calls for this
    /// endpoint must not be made.
    async fn send_build(
        &self,
        service: &dyn DashboardService,
        endpoint: &Endpoint,
        request: &BuildDataCreateRequest,
        what: &str,
        console: &dyn ConsoleSink,
    ) -> Option<BuildPublication> {
        let url = service.service_url();
        match BuildPublisher::new(service, endpoint).publish(request).await {
            Ok(publication) => {
                let token = publication.correlation_token();
                self.say(
                    console,
                    &format!(
                        "Published build {what} data to {url}. Response Code: {}. {token}",
                        publication.response.status_code
                    ),
                );
                obs::emit_build_published(url, &token, publication.dashboard_link.as_deref());
                Some(publication)
            }
            Err(PublishError::Parse { source, .. }) => {
                self.say(
                    console,
                    &format!(
                        "Published build {what} data to {url}, however error reading response. {source}"
                    ),
                );
                obs::emit_publish_failed(url, "build", &source);
                None
            }
            Err(e) => {
                self.say(console, &format!("Failed publishing build {what} data to {url}. {e}"));
                obs::emit_publish_failed(url, "build", &e);
                None
            }
        }
    }

    fn report_generic(
        &self,
        console: &dyn ConsoleSink,
        endpoint: &Endpoint,
        reports: &[GenericItemReport],
    ) {
        for report in reports {
            let source = report.source.as_deref().unwrap_or("-");
            match &report.outcome {
                Ok(response) => {
                    self.say(
                        console,
                        &format!(
                            "Published generic item {} from {source}. {response}",
                            report.tool_name
                        ),
                    );
                    obs::emit_item_published(
                        &endpoint.service_url,
                        "generic_item",
                        response.status_code,
                    );
                }
                Err(e) => {
                    self.say(
                        console,
                        &format!(
                            "Failed publishing generic item {} from {source}. {e}",
                            report.tool_name
                        ),
                    );
                    obs::emit_publish_failed(&endpoint.service_url, "generic_item", e);
                }
            }
        }
    }
}

#[async_trait]
impl BuildListener for Orchestrator {
    async fn on_build_started(&self, ctx: &BuildEventContext, console: &dyn ConsoleSink) {
        let phase = EventPhase::Started;
        let endpoints = self.config.endpoints();
        if endpoints.is_empty() {
            self.skip(console, phase, ctx, "no service endpoints were configured");
            return;
        }
        if !self.config.publishing_enabled() {
            self.skip(console, phase, ctx, "publishing is disabled in configuration");
            return;
        }
        if self.config.is_job_excluded(&ctx.job_name) {
            self.skip(console, phase, ctx, "the job was excluded in configuration");
            return;
        }

        for endpoint in &endpoints {
            self.start_endpoint(ctx, endpoint, console)
                .instrument(obs::endpoint_span(endpoint, phase))
                .await;
        }
    }

    async fn on_build_completed(&self, ctx: &BuildEventContext, console: &dyn ConsoleSink) {
        let phase = EventPhase::Completed;
        if !self.config.publishing_enabled() {
            debug!(job = %ctx.job_name, "Publishing disabled");
            return;
        }
        let started = Instant::now();

        if self.config.show_console_output {
            console.println(&format!("Finished: {}", ctx.result_label()));
        }
        if self.config.is_job_excluded(&ctx.job_name) {
            self.skip(console, phase, ctx, "the job was excluded in configuration");
            return;
        }
        self.say(
            console,
            &format!(
                "Automatically publishing build data using buildcast {VERSION}. Please refresh your browser to see the status."
            ),
        );

        let endpoints = self.config.endpoints();
        if endpoints.is_empty() {
            self.skip(console, phase, ctx, "no service endpoints were configured");
            return;
        }

        for endpoint in &endpoints {
            self.complete_endpoint(ctx, endpoint, console)
                .instrument(obs::endpoint_span(endpoint, phase))
                .await;
        }

        let elapsed = started.elapsed();
        self.say(
            console,
            &format!(
                "*** publish completed in {} seconds at {} ***",
                elapsed.as_secs(),
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f")
            ),
        );
        obs::emit_publish_completed(
            &ctx.job_name,
            endpoints.len(),
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildcast_core::fakes::{FakeServiceFactory, MemoryConsole};

    fn ctx() -> BuildEventContext {
        serde_json::from_value(serde_json::json!({
            "job_name": "svc", "job_url": "http://ci/job/svc/",
            "build_url": "http://ci/job/svc/1/", "instance_url": "http://ci/",
            "build_number": 1, "start_time_millis": 0, "kind": "freestyle",
            "result": "SUCCESS"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_console_output_off_writes_nothing() {
        let config = PublisherConfig {
            publish_build_data: true,
            show_console_output: false,
            api_urls: "http://a/api".to_string(),
            ..PublisherConfig::default()
        };
        let factory = Arc::new(FakeServiceFactory::new());
        let orchestrator = Orchestrator::new(config, factory.clone());
        let console = MemoryConsole::new();

        orchestrator.on_build_completed(&ctx(), &console).await;

        assert!(console.lines().is_empty());
        assert_eq!(factory.service("http://a/api").build_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_quality_only_config_still_sends_build_record() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lint.json"), "[]").unwrap();
        let config = PublisherConfig {
            api_urls: "http://a/api".to_string(),
            generic_items: vec![buildcast_core::GenericItemConfig {
                tool_name: "lint".to_string(),
                pattern: "*.json".to_string(),
                publish_on_start: false,
            }],
            ..PublisherConfig::default()
        };
        let factory = Arc::new(FakeServiceFactory::new());
        let service = factory.service("http://a/api");
        service
            .push_build(Ok(buildcast_core::ServiceResponse::new(
                201,
                r#"{"id":4,"collectorItemId":8,"clientReference":"cr"}"#,
            )))
            .push_generic(Ok(buildcast_core::ServiceResponse::new(201, "")));
        let mut ctx = ctx();
        ctx.workspace = Some(dir.path().to_path_buf());

        Orchestrator::new(config, factory.clone())
            .on_build_completed(&ctx, &MemoryConsole::new())
            .await;

        assert_eq!(service.build_requests().len(), 1);
        let sent = service.generic_requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].build_token.as_deref(), Some("4,8"));
        assert_eq!(sent[0].client_reference.as_deref(), Some("cr"));
    }
}
