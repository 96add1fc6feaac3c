//! Dashboard API payloads and the reference pair that correlates them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::model::{BuildEventContext, BuildStatus};
use crate::stage::Stage;

/// Payload for `POST {api}/v3/build`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDataCreateRequest {
    pub number: String,
    pub build_url: String,
    pub job_name: String,
    pub job_url: String,
    pub instance_url: String,
    /// Name identifying the build runtime instance to the dashboard
    pub nice_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_by: Option<String>,
    pub build_status: BuildStatus,
    pub start_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<Stage>,
    pub client_reference: Option<String>,
}

impl BuildDataCreateRequest {
    fn base(ctx: &BuildEventContext, instance_name: &str, status: BuildStatus) -> Self {
        Self {
            number: ctx.build_number.to_string(),
            build_url: ctx.build_url.clone(),
            job_name: ctx.job_name.clone(),
            job_url: ctx.job_url.clone(),
            instance_url: ctx.instance_url.clone(),
            nice_name: instance_name.to_string(),
            started_by: None,
            build_status: status,
            start_time: ctx.start_time_millis,
            end_time: None,
            duration: None,
            stages: Vec::new(),
            client_reference: None,
        }
    }

    /// Build record sent when a build starts: in progress, no stages.
    pub fn started(ctx: &BuildEventContext, instance_name: &str) -> Self {
        Self::base(ctx, instance_name, BuildStatus::InProgress)
    }

    /// Build record sent on completion with the enriched stages.
    pub fn completed(
        ctx: &BuildEventContext,
        instance_name: &str,
        stages: Vec<Stage>,
        started_by: Option<String>,
    ) -> Self {
        let mut request = Self::base(ctx, instance_name, BuildStatus::from_result(ctx.result));
        request.started_by = started_by;
        request.end_time = ctx.end_time_millis();
        request.duration = ctx.duration_millis;
        request.stages = stages;
        request
    }
}

/// Body of a `201 Created` answer to a build create call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDataCreateResponse {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(deserialize_with = "id_string")]
    pub collector_item_id: String,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub dashboard_id: Option<String>,
    #[serde(default)]
    pub client_reference: Option<String>,
    #[serde(default)]
    pub build_url: Option<String>,
}

/// Identifiers from a successful build create, shared by every later call to
/// the same endpoint so the dashboard can correlate them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePair {
    pub created_entity_id: String,
    pub collector_item_id: String,
    pub client_reference: Option<String>,
    pub build_url: Option<String>,
}

impl ReferencePair {
    /// Opaque `"{id},{collectorItemId}"` token handed to extractors.
    pub fn correlation_token(&self) -> String {
        format!("{},{}", self.created_entity_id, self.collector_item_id)
    }
}

impl From<&BuildDataCreateResponse> for ReferencePair {
    fn from(response: &BuildDataCreateResponse) -> Self {
        Self {
            created_entity_id: response.id.clone(),
            collector_item_id: response.collector_item_id.clone(),
            client_reference: response.client_reference.clone(),
            build_url: response.build_url.clone(),
        }
    }
}

/// Payload for `POST {api}/quality/static-analysis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeQualityCreateRequest {
    pub project_name: String,
    pub server_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,
    pub nice_name: String,
    /// Correlation token of the build this analysis belongs to
    #[serde(default)]
    pub build_token: Option<String>,
    #[serde(default)]
    pub client_reference: Option<String>,
    #[serde(default)]
    pub build_url: Option<String>,
    pub timestamp: i64,
}

/// Payload for `POST {api}/generic-item`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericItemCreateRequest {
    pub tool_name: String,
    pub raw_data: String,
    pub source: String,
    #[serde(default)]
    pub build_token: Option<String>,
    #[serde(default)]
    pub client_reference: Option<String>,
    #[serde(default)]
    pub build_url: Option<String>,
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    opt_id_string(deserializer)?
        .ok_or_else(|| serde::de::Error::custom("missing identifier"))
}

// Identifiers arrive as strings or numbers depending on the dashboard backend.
fn opt_id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number identifier, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BuildKind, BuildResult};

    fn ctx() -> BuildEventContext {
        BuildEventContext {
            job_name: "svc".to_string(),
            job_url: "http://ci/job/svc/".to_string(),
            build_url: "http://ci/job/svc/4/".to_string(),
            instance_url: "http://ci/".to_string(),
            build_number: 4,
            start_time_millis: 10,
            duration_millis: Some(90),
            result: Some(BuildResult::Failure),
            triggering_user: None,
            kind: BuildKind::Freestyle,
            workspace: None,
            console_log: String::new(),
        }
    }

    #[test]
    fn test_started_request_is_in_progress() {
        let request = BuildDataCreateRequest::started(&ctx(), "ci-main");
        assert_eq!(request.build_status, BuildStatus::InProgress);
        assert_eq!(request.number, "4");
        assert!(request.end_time.is_none());
        assert!(request.client_reference.is_none());
    }

    #[test]
    fn test_completed_request_fields() {
        let request =
            BuildDataCreateRequest::completed(&ctx(), "ci-main", Vec::new(), Some("bob".into()));
        assert_eq!(request.build_status, BuildStatus::Failure);
        assert_eq!(request.end_time, Some(100));
        assert_eq!(request.duration, Some(90));

        let v = serde_json::to_value(&request).expect("to_value");
        assert_eq!(v["niceName"], "ci-main");
        assert_eq!(v["startedBy"], "bob");
        assert_eq!(v["buildStatus"], "Failure");
        assert!(v.get("stages").is_none(), "empty stage list is omitted");
    }

    #[test]
    fn test_response_accepts_numeric_ids() {
        let response: BuildDataCreateResponse =
            serde_json::from_str(r#"{"id": 5, "collectorItemId": 9, "dashboardId": 3}"#)
                .expect("parse");
        let pair = ReferencePair::from(&response);
        assert_eq!(pair.correlation_token(), "5,9");
        assert_eq!(response.dashboard_id.as_deref(), Some("3"));
    }

    #[test]
    fn test_response_without_collector_item_is_rejected() {
        let parsed = serde_json::from_str::<BuildDataCreateResponse>(r#"{"id": "abc"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_blank_dashboard_id_is_absent() {
        let response: BuildDataCreateResponse = serde_json::from_str(
            r#"{"id": "a1", "collectorItemId": "c2", "dashboardId": "", "buildUrl": "http://ci/b/1"}"#,
        )
        .expect("parse");
        assert!(response.dashboard_id.is_none());
        assert_eq!(response.build_url.as_deref(), Some("http://ci/b/1"));
    }
}
