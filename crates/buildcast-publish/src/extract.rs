//! Payload extractors for code quality and generic artifact data.
//!
//! Both are collaborator seams: the orchestrator only needs "a payload or
//! nothing". The defaults here read the build's console log and workspace.

use async_trait::async_trait;
use buildcast_core::{
    BuildEventContext, CodeQualityCreateRequest, ExtractError, GenericItemCreateRequest,
};
use regex::Regex;
use std::path::{Component, Path};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Produces the code quality payload for a finished build.
#[async_trait]
pub trait QualityExtractor: Send + Sync {
    /// `build_token` is the `"{id},{collectorItemId}"` correlation token of
    /// the build create call, when one succeeded.
    async fn extract(
        &self,
        ctx: &BuildEventContext,
        instance_name: &str,
        build_token: Option<&str>,
        use_proxy: bool,
    ) -> Result<Option<CodeQualityCreateRequest>, ExtractError>;
}

/// Produces zero or more artifact payloads for one generic item rule.
#[async_trait]
pub trait ArtifactExtractor: Send + Sync {
    async fn extract(
        &self,
        ctx: &BuildEventContext,
        tool_name: &str,
        pattern: &str,
        build_token: Option<&str>,
    ) -> Result<Vec<GenericItemCreateRequest>, ExtractError>;
}

// ---------------------------------------------------------------------------
// ConsoleQualityExtractor
// ---------------------------------------------------------------------------

/// Finds the static-analysis result link printed by the scanner in the
/// console log.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleQualityExtractor;

fn analysis_marker() -> Option<&'static Regex> {
    static MARKER: OnceLock<Option<Regex>> = OnceLock::new();
    MARKER
        .get_or_init(|| {
            Regex::new(r"ANALYSIS SUCCESSFUL, you can (?:browse|find the results at:?)\s+(\S+)").ok()
        })
        .as_ref()
}

/// Split an analysis dashboard URL into (server URL, project key).
fn split_dashboard_url(url: &str) -> Option<(String, String)> {
    let (server, rest) = match url.find("/dashboard") {
        Some(pos) => (&url[..pos], &url[pos..]),
        None => return None,
    };
    let project = match rest.split_once('?') {
        Some((_, query)) => query
            .split('&')
            .find_map(|kv| kv.strip_prefix("id=")),
        None => rest.rsplit('/').next(),
    }?;
    if server.is_empty() || project.is_empty() {
        return None;
    }
    Some((server.to_string(), project.to_string()))
}

#[async_trait]
impl QualityExtractor for ConsoleQualityExtractor {
    async fn extract(
        &self,
        ctx: &BuildEventContext,
        instance_name: &str,
        build_token: Option<&str>,
        _use_proxy: bool,
    ) -> Result<Option<CodeQualityCreateRequest>, ExtractError> {
        // The last analysis in the log wins.
        let Some(url) = analysis_marker()
            .into_iter()
            .flat_map(|re| re.captures_iter(&ctx.console_log))
            .filter_map(|c| c.get(1))
            .last()
            .map(|m| m.as_str().to_string())
        else {
            debug!("No analysis result in console log");
            return Ok(None);
        };

        let Some((server_url, project_name)) = split_dashboard_url(&url) else {
            warn!(url = %url, "Analysis link has an unexpected shape");
            return Ok(None);
        };

        Ok(Some(CodeQualityCreateRequest {
            project_name,
            server_url,
            dashboard_url: Some(url),
            nice_name: instance_name.to_string(),
            build_token: build_token.map(str::to_string),
            client_reference: None,
            build_url: Some(ctx.build_url.clone()),
            timestamp: ctx.end_time_millis().unwrap_or(ctx.start_time_millis),
        }))
    }
}

// ---------------------------------------------------------------------------
// WorkspaceArtifactExtractor
// ---------------------------------------------------------------------------

/// Publishes every workspace file matching the rule's glob as one item.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkspaceArtifactExtractor;

#[async_trait]
impl ArtifactExtractor for WorkspaceArtifactExtractor {
    async fn extract(
        &self,
        ctx: &BuildEventContext,
        tool_name: &str,
        pattern: &str,
        build_token: Option<&str>,
    ) -> Result<Vec<GenericItemCreateRequest>, ExtractError> {
        let Some(workspace) = ctx.workspace.as_deref() else {
            debug!(tool = %tool_name, "Build has no workspace");
            return Ok(Vec::new());
        };

        let full_pattern = workspace_pattern(workspace, pattern)?;
        let paths = glob::glob(&full_pattern).map_err(|e| ExtractError::Pattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        let mut requests = Vec::new();
        for entry in paths {
            let path = match entry {
                Ok(path) if path.is_file() => path,
                Ok(_) => continue,
                Err(e) => {
                    warn!(tool = %tool_name, error = %e, "Skipping unreadable match");
                    continue;
                }
            };
            match std::fs::read_to_string(&path) {
                Ok(raw_data) => requests.push(GenericItemCreateRequest {
                    tool_name: tool_name.to_string(),
                    raw_data,
                    source: relative_source(workspace, &path),
                    build_token: build_token.map(str::to_string),
                    client_reference: None,
                    build_url: None,
                }),
                Err(e) => {
                    warn!(tool = %tool_name, path = %path.display(), error = %e, "Skipping unreadable artifact");
                }
            }
        }
        Ok(requests)
    }
}

/// Glob for `pattern` rooted at `workspace`. The workspace path is matched
/// literally and the pattern may not leave it.
fn workspace_pattern(workspace: &Path, pattern: &str) -> Result<String, ExtractError> {
    let rule = Path::new(pattern);
    let escapes = rule.is_absolute()
        || rule
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ExtractError::Pattern {
            pattern: pattern.to_string(),
            reason: "pattern must stay inside the workspace".to_string(),
        });
    }
    let root = glob::Pattern::escape(&workspace.to_string_lossy());
    Ok(format!("{}/{}", root.trim_end_matches('/'), pattern))
}

fn relative_source(workspace: &Path, path: &Path) -> String {
    path.strip_prefix(workspace)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
