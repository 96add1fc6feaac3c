//! Generic artifact item publishing.

use buildcast_core::{
    BuildEventContext, DashboardService, GenericItemConfig, GenericItemCreateRequest,
    ServiceResponse,
};
use tracing::debug;

use crate::error::{PublishCall, PublishError};
use crate::extract::ArtifactExtractor;

/// Correlation fields stamped on every generic item of one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenericTags {
    pub client_reference: Option<String>,
    pub build_url: String,
}

/// Result of one generic item publish attempt.
#[derive(Debug)]
pub struct GenericItemReport {
    pub tool_name: String,
    /// Artifact the item came from; `None` when extraction itself failed
    pub source: Option<String>,
    pub outcome: Result<ServiceResponse, PublishError>,
}

impl GenericItemReport {
    pub fn is_published(&self) -> bool {
        self.outcome.is_ok()
    }
}

pub struct GenericItemPublisher<'a> {
    service: &'a dyn DashboardService,
    extractor: &'a dyn ArtifactExtractor,
}

impl<'a> GenericItemPublisher<'a> {
    pub fn new(service: &'a dyn DashboardService, extractor: &'a dyn ArtifactExtractor) -> Self {
        Self { service, extractor }
    }

    /// Publish every item of every rule, in rule order.
    ///
    /// A failing rule or item is reported and the rest still go out.
    pub async fn publish(
        &self,
        ctx: &BuildEventContext,
        items: &[&GenericItemConfig],
        build_token: Option<&str>,
        tags: &GenericTags,
    ) -> Vec<GenericItemReport> {
        let mut reports = Vec::new();
        for item in items {
            let requests = match self
                .extractor
                .extract(ctx, &item.tool_name, &item.pattern, build_token)
                .await
            {
                Ok(requests) => requests,
                Err(source) => {
                    reports.push(GenericItemReport {
                        tool_name: item.tool_name.clone(),
                        source: None,
                        outcome: Err(PublishError::Extract {
                            call: PublishCall::GenericItem,
                            source,
                        }),
                    });
                    continue;
                }
            };
            debug!(tool = %item.tool_name, count = requests.len(), "Extracted generic items");

            for mut request in requests {
                request.client_reference = tags.client_reference.clone();
                request.build_url = Some(tags.build_url.clone());
                let outcome = self.send(&request).await;
                reports.push(GenericItemReport {
                    tool_name: item.tool_name.clone(),
                    source: Some(request.source),
                    outcome,
                });
            }
        }
        reports
    }

    async fn send(&self, request: &GenericItemCreateRequest) -> Result<ServiceResponse, PublishError> {
        let response = self
            .service
            .publish_generic_item(request)
            .await
            .map_err(|source| PublishError::Transport {
                call: PublishCall::GenericItem,
                source,
            })?;
        if !response.is_created() {
            return Err(PublishError::Rejected {
                call: PublishCall::GenericItem,
                response,
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use buildcast_core::fakes::ScriptedService;
    use buildcast_core::ExtractError;

    /// Yields one item per rule, named after the rule's pattern. A pattern
    /// of `"!"` fails.
    struct PatternEcho;

    #[async_trait]
    impl ArtifactExtractor for PatternEcho {
        async fn extract(
            &self,
            _ctx: &BuildEventContext,
            tool_name: &str,
            pattern: &str,
            build_token: Option<&str>,
        ) -> Result<Vec<GenericItemCreateRequest>, ExtractError> {
            if pattern == "!" {
                return Err(ExtractError::Other("boom".to_string()));
            }
            Ok(vec![GenericItemCreateRequest {
                tool_name: tool_name.to_string(),
                raw_data: "{}".to_string(),
                source: pattern.to_string(),
                build_token: build_token.map(str::to_string),
                client_reference: None,
                build_url: None,
            }])
        }
    }

    fn ctx() -> BuildEventContext {
        serde_json::from_value(serde_json::json!({
            "job_name": "svc", "job_url": "u", "build_url": "http://ci/job/svc/1/",
            "instance_url": "http://ci/", "build_number": 1, "start_time_millis": 0
        }))
        .unwrap()
    }

    fn rule(tool: &str, pattern: &str) -> GenericItemConfig {
        GenericItemConfig {
            tool_name: tool.to_string(),
            pattern: pattern.to_string(),
            publish_on_start: false,
        }
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_remaining_items() {
        let service = ScriptedService::new("http://a/api");
        service
            .push_generic(Ok(ServiceResponse::new(500, "nope")))
            .push_generic(Ok(ServiceResponse::new(201, "")));
        let rules = [rule("bad", "!"), rule("lint", "lint.json"), rule("cov", "cov.json")];
        let refs: Vec<&GenericItemConfig> = rules.iter().collect();
        let tags = GenericTags {
            client_reference: Some("cr-1".to_string()),
            build_url: "http://ci/job/svc/1/".to_string(),
        };

        let reports = GenericItemPublisher::new(&service, &PatternEcho)
            .publish(&ctx(), &refs, Some("5,9"), &tags)
            .await;

        assert_eq!(reports.len(), 3);
        assert!(matches!(reports[0].outcome, Err(PublishError::Extract { .. })));
        assert!(reports[0].source.is_none());
        assert!(matches!(reports[1].outcome, Err(PublishError::Rejected { .. })));
        assert!(reports[2].is_published());

        let sent = service.generic_requests();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|r| r.build_token.as_deref() == Some("5,9")
            && r.client_reference.as_deref() == Some("cr-1")
            && r.build_url.as_deref() == Some("http://ci/job/svc/1/")));
    }

    #[tokio::test]
    async fn test_no_rules_no_calls() {
        let service = ScriptedService::new("http://a/api");
        let reports = GenericItemPublisher::new(&service, &PatternEcho)
            .publish(&ctx(), &[], None, &GenericTags::default())
            .await;
        assert!(reports.is_empty());
        assert!(service.calls().is_empty());
    }
}
