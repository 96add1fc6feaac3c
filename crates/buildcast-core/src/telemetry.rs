//! Centralised tracing initialisation for buildcast binaries.
//!
//! Call [`init_tracing`] once at program start. Later calls are ignored
//! because the global subscriber can only be set once per process.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// * `json`: emit newline-delimited JSON log lines.
/// * `level`: default verbosity when `RUST_LOG` is not set.
///
/// Tracing output goes to stderr so it never interleaves with console lines
/// written to stdout.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let registry = tracing_subscriber::registry().with(env_filter);
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    // A subscriber set by an embedding process wins.
    if json {
        registry.with(console_layer.json()).try_init().ok();
    } else {
        registry.with(console_layer).try_init().ok();
    }
}
