//! Error types for the publishing pipeline

use buildcast_core::{ClientError, ExtractError, ServiceResponse};
use thiserror::Error;

/// Which dashboard call a [`PublishError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishCall {
    Build,
    CodeQuality,
    GenericItem,
}

impl std::fmt::Display for PublishCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PublishCall::Build => "build data",
            PublishCall::CodeQuality => "code quality data",
            PublishCall::GenericItem => "generic item",
        })
    }
}

/// A failed publish call. Always non-fatal to the event as a whole.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("{call} request failed: {source}")]
    Transport {
        call: PublishCall,
        #[source]
        source: ClientError,
    },

    #[error("{call} was not created. {response}")]
    Rejected {
        call: PublishCall,
        response: ServiceResponse,
    },

    #[error("{call} was published, however the response could not be read: {source}")]
    Parse {
        call: PublishCall,
        #[source]
        source: serde_json::Error,
    },

    #[error("{call} extraction failed: {source}")]
    Extract {
        call: PublishCall,
        #[source]
        source: ExtractError,
    },
}

/// Step of the stage enrichment pipeline. Used in error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentPhase {
    Discovery,
    NodeLinks,
    LogCapture,
}

impl std::fmt::Display for EnrichmentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EnrichmentPhase::Discovery => "stage discovery",
            EnrichmentPhase::NodeLinks => "node link resolution",
            EnrichmentPhase::LogCapture => "log capture",
        })
    }
}

/// Malformed or unavailable stage data. Aborts enrichment for the whole
/// build; publishing continues with whatever stages were filled so far.
#[derive(Error, Debug)]
pub enum EnrichmentError {
    #[error("{phase} request to {url} failed: {source}")]
    Transport {
        phase: EnrichmentPhase,
        url: String,
        #[source]
        source: ClientError,
    },

    #[error("{phase} request to {url} returned status {status}")]
    UnexpectedStatus {
        phase: EnrichmentPhase,
        url: String,
        status: u16,
    },

    #[error("malformed {phase} response from {url}: {source}")]
    Parse {
        phase: EnrichmentPhase,
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("stage '{stage}' has no self link")]
    MissingSelfLink { stage: String },

    #[error("failed stage '{stage}' has no log link")]
    MissingLogLink { stage: String },
}

impl EnrichmentError {
    /// Message of the innermost error in the source chain.
    pub fn root_cause(&self) -> String {
        let mut current: &dyn std::error::Error = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current.to_string()
    }
}
