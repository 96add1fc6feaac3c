//! Error types shared across buildcast crates

use thiserror::Error;

/// Transport-level failures from a [`crate::DashboardService`] call.
///
/// Cloneable so fakes can replay the same scripted failure more than once.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The HTTP client itself could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    /// Connection, TLS, timeout or protocol failure
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// The response arrived but its body could not be read
    #[error("failed to read response body from {url}: {reason}")]
    Body { url: String, reason: String },

    /// The request payload could not be serialized
    #[error("failed to encode request: {0}")]
    Encode(String),
}

/// Result type for service calls
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Errors raised while loading or validating [`crate::PublisherConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid excluded job pattern '{pattern}': {reason}")]
    InvalidExclusion { pattern: String, reason: String },

    #[error("generic item #{index} has an empty {field}")]
    InvalidGenericItem { index: usize, field: &'static str },
}

/// Errors raised by quality/artifact extractors
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("invalid file pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("extractor failed: {0}")]
    Other(String),
}
