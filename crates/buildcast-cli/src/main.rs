//! buildcast - Build Telemetry Publisher CLI
//!
//! Replays build lifecycle events through the publishing pipeline using the
//! real HTTP transport. Console lines go to stdout, tracing to stderr.
//!
//! ## Commands
//!
//! - `started`: publish a build start event
//! - `completed`: publish a build completion event
//! - `lifecycle`: publish start, then completion, for the same build

use anyhow::{Context, Result};
use buildcast_client::HttpServiceFactory;
use buildcast_core::{BuildEventContext, PublisherConfig, StdoutConsole};
use buildcast_publish::{BuildListener, Orchestrator};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "buildcast")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Publish build telemetry to dashboard services", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Publisher configuration (TOML). Without it, defaults plus
    /// `BUILDCAST_*` environment variables are used
    #[arg(short, long, global = true, env = "BUILDCAST_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a build start event
    Started {
        /// Build snapshot (JSON)
        #[arg(short, long)]
        build: PathBuf,
    },

    /// Publish a build completion event
    Completed {
        /// Build snapshot (JSON)
        #[arg(short, long)]
        build: PathBuf,
    },

    /// Publish start then completion for one build
    Lifecycle {
        /// Build snapshot (JSON)
        #[arg(short, long)]
        build: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    buildcast_core::telemetry::init_tracing(cli.json, level);

    let config = load_config(cli.config.as_deref())?;
    let orchestrator = Orchestrator::new(config, Arc::new(HttpServiceFactory));
    let console = StdoutConsole;

    match cli.command {
        Commands::Started { build } => {
            let ctx = load_build(&build)?;
            orchestrator.on_build_started(&ctx, &console).await;
        }
        Commands::Completed { build } => {
            let ctx = load_build(&build)?;
            orchestrator.on_build_completed(&ctx, &console).await;
        }
        Commands::Lifecycle { build } => {
            let ctx = load_build(&build)?;
            orchestrator.on_build_started(&ctx, &console).await;
            orchestrator.on_build_completed(&ctx, &console).await;
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PublisherConfig> {
    load_config_from(path, |key| std::env::var(key).ok())
}

fn load_config_from<F>(path: Option<&Path>, lookup: F) -> Result<PublisherConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let config = match path {
        Some(path) => PublisherConfig::from_path(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => PublisherConfig::default(),
    }
    .apply_env_from(lookup);

    let endpoints = config.endpoints();
    info!(
        endpoints = endpoints.len(),
        publishing = config.publishing_enabled(),
        "Loaded publisher configuration"
    );
    Ok(config)
}

fn load_build(path: &Path) -> Result<BuildEventContext> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read build snapshot: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid build snapshot in {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildcast_core::BuildKind;

    #[test]
    fn test_load_build_applies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.json");
        std::fs::write(
            &path,
            r#"{"job_name":"svc","job_url":"http://ci/job/svc/","build_url":"http://ci/job/svc/3/",
                "instance_url":"http://ci/","build_number":3,"start_time_millis":1000}"#,
        )
        .unwrap();

        let ctx = load_build(&path).unwrap();
        assert_eq!(ctx.build_number, 3);
        assert_eq!(ctx.kind, BuildKind::Pipeline);
        assert!(ctx.result.is_none());
    }

    #[test]
    fn test_load_build_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.json");
        std::fs::write(&path, "{").unwrap();
        assert!(load_build(&path).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buildcast.toml");
        std::fs::write(
            &path,
            "publish_build_data = true\napi_urls = \"http://a/api\"\ninstance_name = \"ci\"\n",
        )
        .unwrap();

        let config = load_config_from(Some(&path), |_| None).unwrap();
        assert!(config.publish_build_data);
        assert_eq!(config.api_urls, "http://a/api");
        assert_eq!(config.instance_name, "ci");
    }

    #[test]
    fn test_load_config_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buildcast.toml");
        std::fs::write(&path, "api_urls = \"http://a/api\"\n").unwrap();

        let config = load_config_from(Some(&path), |key| {
            (key == "BUILDCAST_API_URLS").then(|| "http://env/api".to_string())
        })
        .unwrap();
        assert_eq!(config.api_urls, "http://env/api");
    }

    #[test]
    fn test_load_config_without_file_uses_defaults() {
        let config = load_config_from(None, |_| None).unwrap();
        assert!(config.api_urls.is_empty());
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_cli_parses_lifecycle() {
        let cli = Cli::try_parse_from([
            "buildcast", "--json", "--config", "c.toml", "lifecycle", "--build", "b.json",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        assert!(matches!(cli.command, Commands::Lifecycle { .. }));
    }
}
