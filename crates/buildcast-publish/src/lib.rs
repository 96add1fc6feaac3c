//! buildcast-publish: Build Event Publishing Pipeline
//!
//! Given a started or completed build, this crate fans out to every
//! configured dashboard endpoint and, per endpoint:
//! 1. enriches pipeline stages from the build runtime (completion only)
//! 2. creates the build record and keeps its [`ReferencePair`]
//! 3. publishes code quality and generic artifact items correlated with it
//!
//! Every failure is non-fatal. Publishers return `Result`s and the
//! [`Orchestrator`] turns them into console lines and `tracing` events.
//!
//! [`ReferencePair`]: buildcast_core::ReferencePair

pub mod build_publisher;
pub mod enrichment;
pub mod error;
pub mod extract;
pub mod generic;
pub mod obs;
pub mod orchestrator;
pub mod quality;

pub use build_publisher::{BuildPublication, BuildPublisher};
pub use enrichment::{describe_url, StageEnricher, DESCRIBE_SUFFIX};
pub use error::{EnrichmentError, EnrichmentPhase, PublishCall, PublishError};
pub use extract::{
    ArtifactExtractor, ConsoleQualityExtractor, QualityExtractor, WorkspaceArtifactExtractor,
};
pub use generic::{GenericItemPublisher, GenericItemReport, GenericTags};
pub use orchestrator::{BuildListener, Orchestrator, CONSOLE_PREFIX};
pub use quality::{QualityOutcome, QualityPublisher};
