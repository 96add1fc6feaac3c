//! buildcast-client: HTTP transport for dashboard services
//!
//! Implements [`buildcast_core::DashboardService`] over reqwest:
//! - `POST {api}/v3/build`
//! - `POST {api}/quality/static-analysis`
//! - `POST {api}/generic-item`
//! - basic-auth `GET` against the build runtime's own API for stage data
//!
//! There is no retry; each call is bounded by the configured client timeout.

pub mod http;

pub use http::{HttpDashboardService, HttpServiceConfig, HttpServiceFactory};
