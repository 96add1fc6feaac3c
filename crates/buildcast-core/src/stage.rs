//! Pipeline stage records and the runtime's stage API response shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stage status as reported by the runtime's describe API.
///
/// Parsing ignores case; unrecognised values are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StageStatus {
    Success,
    Failed,
    Aborted,
    Unstable,
    InProgress,
    NotExecuted,
    PausedPendingInput,
    Other(String),
}

impl StageStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, StageStatus::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            StageStatus::Success => "SUCCESS",
            StageStatus::Failed => "FAILED",
            StageStatus::Aborted => "ABORTED",
            StageStatus::Unstable => "UNSTABLE",
            StageStatus::InProgress => "IN_PROGRESS",
            StageStatus::NotExecuted => "NOT_EXECUTED",
            StageStatus::PausedPendingInput => "PAUSED_PENDING_INPUT",
            StageStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for StageStatus {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "SUCCESS" => StageStatus::Success,
            "FAILED" => StageStatus::Failed,
            "ABORTED" => StageStatus::Aborted,
            "UNSTABLE" => StageStatus::Unstable,
            "IN_PROGRESS" => StageStatus::InProgress,
            "NOT_EXECUTED" => StageStatus::NotExecuted,
            "PAUSED_PENDING_INPUT" => StageStatus::PausedPendingInput,
            _ => StageStatus::Other(raw),
        }
    }
}

impl From<StageStatus> for String {
    fn from(status: StageStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stage of a pipeline build.
///
/// Created by stage discovery, then filled in place: `exec_node_log_url`
/// by node-link resolution and `log` by failure log capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    #[serde(rename = "stageId", alias = "id", default)]
    pub id: String,
    pub name: String,
    pub status: StageStatus,
    #[serde(default)]
    pub start_time_millis: i64,
    #[serde(default)]
    pub duration_millis: i64,
    #[serde(rename = "_links", default)]
    pub links: Map<String, Value>,
    #[serde(
        rename = "exec_node_logUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub exec_node_log_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

impl Stage {
    /// `_links.self.href`, if present and a string.
    pub fn self_href(&self) -> Option<&str> {
        self.links.get("self")?.get("href")?.as_str()
    }
}

#[derive(Debug, Deserialize)]
struct StageDescription {
    #[serde(default)]
    stages: Vec<Stage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeDescription {
    #[serde(default)]
    stage_flow_nodes: Vec<FlowNode>,
}

#[derive(Debug, Deserialize)]
struct FlowNode {
    #[serde(rename = "_links", default)]
    links: Map<String, Value>,
}

/// Parse a build describe response into its stage list.
pub fn parse_stage_list(body: &str) -> serde_json::Result<Vec<Stage>> {
    let description: StageDescription = serde_json::from_str(body)?;
    Ok(description.stages)
}

/// Parse a stage node describe response and return the log href of its
/// first flow node.
pub fn parse_node_log_href(body: &str) -> serde_json::Result<Option<String>> {
    let description: NodeDescription = serde_json::from_str(body)?;
    Ok(description
        .stage_flow_nodes
        .iter()
        .find_map(|node| node.links.get("log")?.get("href")?.as_str())
        .map(str::to_string))
}
