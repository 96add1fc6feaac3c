//! buildcast-core: Domain Model and Service Contracts
//!
//! This crate holds everything the publishing pipeline shares:
//! - `BuildEventContext`: read-only snapshot of the build an event is about
//! - `Stage`: one pipeline stage, enriched in place by the stage pipeline
//! - Request/response payloads for the dashboard API and the `ReferencePair`
//! - `PublisherConfig` and the `EndpointSet` resolver
//! - `DashboardService` / `ServiceFactory`: the per-endpoint transport seam
//! - `ConsoleSink`: the append-only build console
//!
//! In-memory fakes for the service and console traits live in [`fakes`].

pub mod config;
pub mod console;
pub mod endpoint;
pub mod error;
pub mod fakes;
pub mod model;
pub mod request;
pub mod service;
pub mod stage;
pub mod telemetry;

pub use config::{GenericItemConfig, PublisherConfig, ENDPOINT_SEPARATOR};
pub use console::{ConsoleSink, StdoutConsole};
pub use endpoint::{resolve_href, Endpoint, EndpointSet, DASHBOARD_PATH};
pub use error::{ClientError, ClientResult, ConfigError, ExtractError};
pub use model::{BuildEventContext, BuildKind, BuildResult, BuildStatus, EventPhase};
pub use request::{
    BuildDataCreateRequest, BuildDataCreateResponse, CodeQualityCreateRequest,
    GenericItemCreateRequest, ReferencePair,
};
pub use service::{
    DashboardService, RuntimeCredentials, ServiceFactory, ServiceResponse, STATUS_CREATED,
    STATUS_OK,
};
pub use stage::{Stage, StageStatus};

/// buildcast version, reported in the completion announcement line
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
