//! Build snapshot handed over by the build runtime with each event.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which lifecycle event is being handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventPhase {
    Started,
    Completed,
}

/// Structural kind of a build. Only pipeline builds expose stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildKind {
    #[default]
    Pipeline,
    Freestyle,
}

impl BuildKind {
    /// Whether the runtime can describe stages for this kind of build.
    pub fn has_stages(&self) -> bool {
        matches!(self, BuildKind::Pipeline)
    }
}

/// Final result as reported by the build runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
}

impl BuildResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildResult::Success => "SUCCESS",
            BuildResult::Unstable => "UNSTABLE",
            BuildResult::Failure => "FAILURE",
            BuildResult::NotBuilt => "NOT_BUILT",
            BuildResult::Aborted => "ABORTED",
        }
    }
}

impl std::fmt::Display for BuildResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build status as understood by the dashboard service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildStatus {
    Success,
    Failure,
    Unstable,
    Aborted,
    NotBuilt,
    InProgress,
    Unknown,
}

impl BuildStatus {
    /// Map a runtime result to a dashboard status. A build without a
    /// result yet is `Unknown`, not `InProgress`; the start event sets
    /// `InProgress` explicitly.
    pub fn from_result(result: Option<BuildResult>) -> Self {
        match result {
            Some(BuildResult::Success) => BuildStatus::Success,
            Some(BuildResult::Failure) => BuildStatus::Failure,
            Some(BuildResult::Unstable) => BuildStatus::Unstable,
            Some(BuildResult::Aborted) => BuildStatus::Aborted,
            Some(BuildResult::NotBuilt) => BuildStatus::NotBuilt,
            None => BuildStatus::Unknown,
        }
    }
}

/// Read-only snapshot of a build, taken once per event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildEventContext {
    /// Full job path (folders included)
    pub job_name: String,
    pub job_url: String,
    pub build_url: String,
    /// Base URL of the build runtime instance; stage links resolve against it
    pub instance_url: String,
    pub build_number: u64,
    pub start_time_millis: i64,
    #[serde(default)]
    pub duration_millis: Option<i64>,
    #[serde(default)]
    pub result: Option<BuildResult>,
    #[serde(default)]
    pub triggering_user: Option<String>,
    #[serde(default)]
    pub kind: BuildKind,
    /// Workspace directory holding build outputs, if the runtime has one
    #[serde(default)]
    pub workspace: Option<PathBuf>,
    #[serde(default)]
    pub console_log: String,
}

impl BuildEventContext {
    /// Human-facing result string used in the `Finished:` console line.
    pub fn result_label(&self) -> &'static str {
        self.result.map(|r| r.as_str()).unwrap_or("UNKNOWN")
    }

    /// End time in epoch millis, when the runtime reported a duration.
    pub fn end_time_millis(&self) -> Option<i64> {
        self.duration_millis
            .and_then(|d| self.start_time_millis.checked_add(d))
    }
}
