//! Structured observability hooks for publishing.
//!
//! Every notable step emits one `tracing` event with an `event` field, so log
//! pipelines can follow a build across endpoints. These are independent of
//! the build console, which only gets lines when console output is enabled.

use buildcast_core::{Endpoint, EventPhase};
use tracing::{info, warn, Span};

/// Span covering all calls made to one endpoint during one event.
pub fn endpoint_span(endpoint: &Endpoint, phase: EventPhase) -> Span {
    tracing::info_span!(
        "buildcast.endpoint",
        service_url = %endpoint.service_url,
        index = endpoint.index,
        phase = ?phase,
    )
}

/// A whole event was not published, with the gate that stopped it.
pub fn emit_event_skipped(phase: EventPhase, job_name: &str, reason: &str) {
    info!(event = "publish.skipped", phase = ?phase, job = %job_name, reason = %reason);
}

/// Build record accepted; `token` is the `{id},{collectorItemId}` pair.
pub fn emit_build_published(service_url: &str, token: &str, dashboard_link: Option<&str>) {
    info!(
        event = "build.published",
        service_url = %service_url,
        token = %token,
        dashboard_link = dashboard_link.unwrap_or(""),
    );
}

/// One call to an endpoint failed. Publishing carries on.
pub fn emit_publish_failed(service_url: &str, call: &str, error: &dyn std::fmt::Display) {
    warn!(event = "publish.failed", service_url = %service_url, call = %call, error = %error);
}

/// Quality or generic item sent, with the status the service answered.
pub fn emit_item_published(service_url: &str, call: &str, status: u16) {
    info!(event = "item.published", service_url = %service_url, call = %call, status = status);
}

/// Stage enrichment stopped early; the build still goes out with `stages_kept` stages.
pub fn emit_enrichment_failed(build_url: &str, root_cause: &str, stages_kept: usize) {
    warn!(
        event = "stages.enrichment_failed",
        build_url = %build_url,
        root_cause = %root_cause,
        stages_kept = stages_kept,
    );
}

/// End of an event across all endpoints.
pub fn emit_publish_completed(job_name: &str, endpoints: usize, duration_ms: u64) {
    info!(
        event = "publish.completed",
        job = %job_name,
        endpoints = endpoints,
        duration_ms = duration_ms,
    );
}
