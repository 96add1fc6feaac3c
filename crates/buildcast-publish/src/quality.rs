//! Code quality publishing.

use buildcast_core::{BuildEventContext, DashboardService, ReferencePair, ServiceResponse};

use crate::error::{PublishCall, PublishError};
use crate::extract::QualityExtractor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualityOutcome {
    Published(ServiceResponse),
    /// The extractor found nothing; no call was made
    NothingToPublish,
}

pub struct QualityPublisher<'a> {
    service: &'a dyn DashboardService,
    extractor: &'a dyn QualityExtractor,
    instance_name: &'a str,
    use_proxy: bool,
}

impl<'a> QualityPublisher<'a> {
    pub fn new(
        service: &'a dyn DashboardService,
        extractor: &'a dyn QualityExtractor,
        instance_name: &'a str,
        use_proxy: bool,
    ) -> Self {
        Self {
            service,
            extractor,
            instance_name,
            use_proxy,
        }
    }

    /// Extract and send the quality payload.
    ///
    /// The extractor receives the string token. When a reference pair is
    /// present its client reference and build URL replace whatever the
    /// extractor filled in.
    pub async fn publish(
        &self,
        ctx: &BuildEventContext,
        build_token: Option<&str>,
        reference: Option<&ReferencePair>,
    ) -> Result<QualityOutcome, PublishError> {
        let extracted = self
            .extractor
            .extract(ctx, self.instance_name, build_token, self.use_proxy)
            .await
            .map_err(|source| PublishError::Extract {
                call: PublishCall::CodeQuality,
                source,
            })?;
        let Some(mut request) = extracted else {
            return Ok(QualityOutcome::NothingToPublish);
        };

        if let Some(pair) = reference {
            request.client_reference = pair.client_reference.clone();
            request.build_url = pair.build_url.clone();
        }

        let response = self
            .service
            .publish_code_quality(&request)
            .await
            .map_err(|source| PublishError::Transport {
                call: PublishCall::CodeQuality,
                source,
            })?;
        if !response.is_created() {
            return Err(PublishError::Rejected {
                call: PublishCall::CodeQuality,
                response,
            });
        }
        Ok(QualityOutcome::Published(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use buildcast_core::fakes::ScriptedService;
    use buildcast_core::{CodeQualityCreateRequest, ExtractError};

    struct FixedExtractor(Option<CodeQualityCreateRequest>);

    #[async_trait]
    impl QualityExtractor for FixedExtractor {
        async fn extract(
            &self,
            _ctx: &BuildEventContext,
            _instance_name: &str,
            build_token: Option<&str>,
            _use_proxy: bool,
        ) -> Result<Option<CodeQualityCreateRequest>, ExtractError> {
            Ok(self.0.clone().map(|mut r| {
                r.build_token = build_token.map(str::to_string);
                r
            }))
        }
    }

    fn ctx() -> BuildEventContext {
        serde_json::from_value(serde_json::json!({
            "job_name": "svc", "job_url": "u", "build_url": "http://ci/job/svc/1/",
            "instance_url": "http://ci/", "build_number": 1, "start_time_millis": 0
        }))
        .unwrap()
    }

    fn payload() -> CodeQualityCreateRequest {
        CodeQualityCreateRequest {
            project_name: "svc".to_string(),
            server_url: "http://sonar".to_string(),
            dashboard_url: None,
            nice_name: "ci".to_string(),
            build_token: None,
            client_reference: Some("guessed".to_string()),
            build_url: Some("guessed".to_string()),
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn test_reference_overrides_extractor_fields() {
        let service = ScriptedService::new("http://a/api");
        service.push_quality(Ok(ServiceResponse::new(201, "")));
        let extractor = FixedExtractor(Some(payload()));
        let pair = ReferencePair {
            created_entity_id: "5".to_string(),
            collector_item_id: "9".to_string(),
            client_reference: Some("cr-1".to_string()),
            build_url: Some("http://ci/job/svc/1/".to_string()),
        };

        let outcome = QualityPublisher::new(&service, &extractor, "ci", false)
            .publish(&ctx(), Some("5,9"), Some(&pair))
            .await
            .expect("publish");
        assert!(matches!(outcome, QualityOutcome::Published(_)));

        let sent = service.quality_requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].build_token.as_deref(), Some("5,9"));
        assert_eq!(sent[0].client_reference.as_deref(), Some("cr-1"));
        assert_eq!(sent[0].build_url.as_deref(), Some("http://ci/job/svc/1/"));
    }

    #[tokio::test]
    async fn test_nothing_extracted_sends_nothing() {
        let service = ScriptedService::new("http://a/api");
        let extractor = FixedExtractor(None);

        let outcome = QualityPublisher::new(&service, &extractor, "ci", false)
            .publish(&ctx(), None, None)
            .await
            .expect("publish");
        assert_eq!(outcome, QualityOutcome::NothingToPublish);
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_without_reference_extractor_fields_stay() {
        let service = ScriptedService::new("http://a/api");
        service.push_quality(Ok(ServiceResponse::new(500, "err")));
        let extractor = FixedExtractor(Some(payload()));

        let err = QualityPublisher::new(&service, &extractor, "ci", false)
            .publish(&ctx(), None, None)
            .await
            .expect_err("rejected");
        assert!(matches!(err, PublishError::Rejected { .. }));
        assert_eq!(
            service.quality_requests()[0].client_reference.as_deref(),
            Some("guessed")
        );
    }
}
