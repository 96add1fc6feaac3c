//! Publisher configuration
//!
//! Loaded from TOML, with secrets and endpoint lists overridable from the
//! environment:
//!
//! ```toml
//! publish_build_data = true
//! api_urls = "http://dash-a/api,http://dash-b/api"
//! dashboard_urls = "http://dash-a,"
//! instance_name = "ci-main"
//!
//! [[generic_items]]
//! tool_name = "coverage"
//! pattern = "target/coverage/*.json"
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::endpoint::EndpointSet;
use crate::error::ConfigError;
use crate::model::EventPhase;
use crate::service::RuntimeCredentials;

/// Delimiter for the service and dashboard URL lists.
pub const ENDPOINT_SEPARATOR: char = ',';

/// A user-defined artifact publish rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericItemConfig {
    pub tool_name: String,
    /// Glob relative to the build workspace
    pub pattern: String,
    #[serde(default)]
    pub publish_on_start: bool,
}

impl GenericItemConfig {
    /// Whether this rule runs for the given event. Every rule belongs to
    /// exactly one phase.
    pub fn applies_to(&self, phase: EventPhase) -> bool {
        match phase {
            EventPhase::Started => self.publish_on_start,
            EventPhase::Completed => !self.publish_on_start,
        }
    }
}

/// Read-only configuration injected into the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Opens the publish gate. Build records go out whenever any publishing
    /// is enabled
    pub publish_build_data: bool,
    pub publish_quality_data: bool,
    pub capture_failure_logs: bool,
    pub show_console_output: bool,
    pub use_proxy: bool,
    /// Delimited dashboard service URLs
    pub api_urls: String,
    /// Delimited dashboard base URLs, paired by position with `api_urls`
    pub dashboard_urls: String,
    pub api_token: Option<String>,
    /// Jobs whose full or short name matches any of these regexes are not published
    pub excluded_jobs: Vec<String>,
    pub runtime_user: String,
    pub runtime_token: String,
    pub instance_name: String,
    pub generic_items: Vec<GenericItemConfig>,
    pub request_timeout_secs: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        PublisherConfig {
            publish_build_data: false,
            publish_quality_data: false,
            capture_failure_logs: false,
            show_console_output: true,
            use_proxy: false,
            api_urls: String::new(),
            dashboard_urls: String::new(),
            api_token: None,
            excluded_jobs: Vec::new(),
            runtime_user: String::new(),
            runtime_token: String::new(),
            instance_name: String::new(),
            generic_items: Vec::new(),
            request_timeout_secs: 30,
        }
    }
}

impl PublisherConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PublisherConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Override values from `BUILDCAST_*` environment variables.
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Override values using an arbitrary variable lookup.
    pub fn apply_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(urls) = lookup("BUILDCAST_API_URLS") {
            self.api_urls = urls;
        }
        if let Some(urls) = lookup("BUILDCAST_DASHBOARD_URLS") {
            self.dashboard_urls = urls;
        }
        if let Some(token) = lookup("BUILDCAST_API_TOKEN") {
            self.api_token = Some(token);
        }
        if let Some(user) = lookup("BUILDCAST_RUNTIME_USER") {
            self.runtime_user = user;
        }
        if let Some(token) = lookup("BUILDCAST_RUNTIME_TOKEN") {
            self.runtime_token = token;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for pattern in &self.excluded_jobs {
            anchored(pattern).map_err(|e| ConfigError::InvalidExclusion {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
        }
        for (index, item) in self.generic_items.iter().enumerate() {
            if item.tool_name.trim().is_empty() {
                return Err(ConfigError::InvalidGenericItem {
                    index,
                    field: "tool_name",
                });
            }
            if item.pattern.trim().is_empty() {
                return Err(ConfigError::InvalidGenericItem {
                    index,
                    field: "pattern",
                });
            }
        }
        Ok(())
    }

    /// Any kind of publishing is switched on.
    pub fn publishing_enabled(&self) -> bool {
        self.publish_build_data || self.publish_quality_data || !self.generic_items.is_empty()
    }

    pub fn endpoints(&self) -> EndpointSet {
        EndpointSet::resolve(self.api_urls.trim(), self.dashboard_urls.trim())
    }

    pub fn runtime_credentials(&self) -> RuntimeCredentials {
        RuntimeCredentials {
            user_id: self.runtime_user.clone(),
            token: self.runtime_token.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Whether `job_name`, or its last `/` segment, fully matches one of the
    /// exclusion patterns. Patterns that do not compile are skipped.
    pub fn is_job_excluded(&self, job_name: &str) -> bool {
        let short_name = job_name.rsplit('/').next().unwrap_or(job_name);
        self.excluded_jobs
            .iter()
            .filter(|p| !p.trim().is_empty())
            .any(|pattern| match anchored(pattern) {
                Ok(re) => re.is_match(job_name) || re.is_match(short_name),
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Ignoring invalid job exclusion");
                    false
                }
            })
    }

    /// Generic item rules for one event phase, in configured order.
    pub fn generic_items_for(&self, phase: EventPhase) -> Vec<&GenericItemConfig> {
        self.generic_items
            .iter()
            .filter(|item| item.applies_to(phase))
            .collect()
    }
}

fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
        publish_build_data = true
        capture_failure_logs = true
        api_urls = "http://a/api,http://b/api"
        dashboard_urls = "http://a/dash,"
        instance_name = "ci-main"
        excluded_jobs = ["sandbox-.*", "scratch"]

        [[generic_items]]
        tool_name = "coverage"
        pattern = "target/*.json"

        [[generic_items]]
        tool_name = "manifest"
        pattern = "manifest.txt"
        publish_on_start = true
    "#;

    #[test]
    fn test_parse_sample() {
        let config = PublisherConfig::from_toml_str(SAMPLE).expect("parse");
        assert!(config.publish_build_data);
        assert!(!config.publish_quality_data);
        assert!(config.show_console_output, "console output defaults on");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.endpoints().len(), 2);
        assert_eq!(config.generic_items.len(), 2);
    }

    #[test]
    fn test_publishing_enabled_by_generic_items_alone() {
        let mut config = PublisherConfig::default();
        assert!(!config.publishing_enabled());
        config.generic_items.push(GenericItemConfig {
            tool_name: "t".to_string(),
            pattern: "*.txt".to_string(),
            publish_on_start: false,
        });
        assert!(config.publishing_enabled());
    }

    #[test]
    fn test_generic_items_partition_by_phase() {
        let config = PublisherConfig::from_toml_str(SAMPLE).expect("parse");
        let started = config.generic_items_for(EventPhase::Started);
        let completed = config.generic_items_for(EventPhase::Completed);
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].tool_name, "manifest");
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].tool_name, "coverage");
    }

    #[test]
    fn test_job_exclusion_matches_whole_name() {
        let config = PublisherConfig::from_toml_str(SAMPLE).expect("parse");
        assert!(config.is_job_excluded("sandbox-42"));
        assert!(config.is_job_excluded("scratch"));
        assert!(!config.is_job_excluded("scratchpad"));
        assert!(!config.is_job_excluded("release"));
    }

    #[test]
    fn test_job_exclusion_matches_short_name_in_folder() {
        let config = PublisherConfig::from_toml_str(SAMPLE).expect("parse");
        assert!(config.is_job_excluded("team/scratch"));
        assert!(config.is_job_excluded("org/team/sandbox-7"));
        assert!(!config.is_job_excluded("scratch/release"));
    }

    #[test]
    fn test_invalid_exclusion_is_rejected() {
        let err = PublisherConfig::from_toml_str(r#"excluded_jobs = ["(unclosed"]"#)
            .expect_err("should fail");
        assert!(matches!(err, ConfigError::InvalidExclusion { .. }));
    }

    #[test]
    fn test_generic_item_requires_pattern() {
        let err = PublisherConfig::from_toml_str(
            r#"
            [[generic_items]]
            tool_name = "x"
            pattern = " "
            "#,
        )
        .expect_err("should fail");
        assert!(matches!(
            err,
            ConfigError::InvalidGenericItem {
                index: 0,
                field: "pattern"
            }
        ));
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("BUILDCAST_API_TOKEN", "secret"),
            ("BUILDCAST_RUNTIME_USER", "bot"),
            ("BUILDCAST_API_URLS", "http://env/api"),
        ]);
        let config = PublisherConfig::default()
            .apply_env_from(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.runtime_credentials().user_id, "bot");
        assert_eq!(config.api_urls, "http://env/api");
        assert!(config.runtime_token.is_empty());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buildcast.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = PublisherConfig::from_path(&path).expect("load");
        assert_eq!(config.instance_name, "ci-main");

        let missing = PublisherConfig::from_path(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
