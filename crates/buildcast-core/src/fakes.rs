//! In-memory fakes for the service and console traits (testing only)
//!
//! Provides `ScriptedService`, `FakeServiceFactory` and `MemoryConsole`.
//! They satisfy the trait contracts without touching the network.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::PublisherConfig;
use crate::console::ConsoleSink;
use crate::endpoint::Endpoint;
use crate::error::{ClientError, ClientResult};
use crate::request::{BuildDataCreateRequest, CodeQualityCreateRequest, GenericItemCreateRequest};
use crate::service::{DashboardService, RuntimeCredentials, ServiceFactory, ServiceResponse};

// ---------------------------------------------------------------------------
// ScriptedService
// ---------------------------------------------------------------------------

/// A call observed by [`ScriptedService`], in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Build(BuildDataCreateRequest),
    CodeQuality(CodeQualityCreateRequest),
    GenericItem(GenericItemCreateRequest),
    StageFetch { url: String, user_id: String },
}

type Scripted = ClientResult<ServiceResponse>;

/// Dashboard service that replays scripted answers and records every call.
///
/// Publish answers are queued per call kind; an exhausted queue answers with
/// a transport error. Stage fetches are answered by URL.
#[derive(Debug)]
pub struct ScriptedService {
    service_url: String,
    builds: Mutex<VecDeque<Scripted>>,
    qualities: Mutex<VecDeque<Scripted>>,
    generics: Mutex<VecDeque<Scripted>>,
    stage_data: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedService {
    pub fn new(service_url: &str) -> Self {
        Self {
            service_url: service_url.to_string(),
            builds: Mutex::new(VecDeque::new()),
            qualities: Mutex::new(VecDeque::new()),
            generics: Mutex::new(VecDeque::new()),
            stage_data: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_build(&self, answer: Scripted) -> &Self {
        self.builds.lock().unwrap().push_back(answer);
        self
    }

    pub fn push_quality(&self, answer: Scripted) -> &Self {
        self.qualities.lock().unwrap().push_back(answer);
        self
    }

    pub fn push_generic(&self, answer: Scripted) -> &Self {
        self.generics.lock().unwrap().push_back(answer);
        self
    }

    /// Answer every fetch of `url` with `answer`.
    pub fn set_stage_data(&self, url: &str, answer: Scripted) -> &Self {
        self.stage_data
            .lock()
            .unwrap()
            .insert(url.to_string(), answer);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn build_requests(&self) -> Vec<BuildDataCreateRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCall::Build(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn quality_requests(&self) -> Vec<CodeQualityCreateRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCall::CodeQuality(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn generic_requests(&self) -> Vec<GenericItemCreateRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCall::GenericItem(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn stage_fetches(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCall::StageFetch { url, .. } => Some(url),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn next(&self, queue: &Mutex<VecDeque<Scripted>>, what: &str) -> Scripted {
        queue.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(ClientError::Transport {
                url: self.service_url.clone(),
                reason: format!("no scripted {what} response"),
            })
        })
    }
}

#[async_trait]
impl DashboardService for ScriptedService {
    fn service_url(&self) -> &str {
        &self.service_url
    }

    async fn publish_build(&self, request: &BuildDataCreateRequest) -> Scripted {
        self.record(RecordedCall::Build(request.clone()));
        self.next(&self.builds, "build")
    }

    async fn publish_code_quality(&self, request: &CodeQualityCreateRequest) -> Scripted {
        self.record(RecordedCall::CodeQuality(request.clone()));
        self.next(&self.qualities, "code quality")
    }

    async fn publish_generic_item(&self, request: &GenericItemCreateRequest) -> Scripted {
        self.record(RecordedCall::GenericItem(request.clone()));
        self.next(&self.generics, "generic item")
    }

    async fn fetch_stage_data(&self, url: &str, credentials: &RuntimeCredentials) -> Scripted {
        self.record(RecordedCall::StageFetch {
            url: url.to_string(),
            user_id: credentials.user_id.clone(),
        });
        self.stage_data
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| {
                Err(ClientError::Transport {
                    url: url.to_string(),
                    reason: "no scripted stage data".to_string(),
                })
            })
    }
}

// ---------------------------------------------------------------------------
// FakeServiceFactory
// ---------------------------------------------------------------------------

/// Hands out one shared [`ScriptedService`] per service URL.
#[derive(Debug, Default)]
pub struct FakeServiceFactory {
    services: Mutex<HashMap<String, Arc<ScriptedService>>>,
    requested: Mutex<Vec<String>>,
}

impl FakeServiceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The service for `url`, created on first use so tests can script it
    /// before the orchestrator runs.
    pub fn service(&self, url: &str) -> Arc<ScriptedService> {
        self.services
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_insert_with(|| Arc::new(ScriptedService::new(url)))
            .clone()
    }

    /// Service URLs the orchestrator asked for, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl ServiceFactory for FakeServiceFactory {
    fn service_for(
        &self,
        endpoint: &Endpoint,
        _config: &PublisherConfig,
    ) -> ClientResult<Arc<dyn DashboardService>> {
        self.requested
            .lock()
            .unwrap()
            .push(endpoint.service_url.clone());
        Ok(self.service(&endpoint.service_url))
    }
}

// ---------------------------------------------------------------------------
// MemoryConsole
// ---------------------------------------------------------------------------

/// Console sink that keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemoryConsole {
    lines: Mutex<Vec<String>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    /// Whether any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().unwrap().iter().any(|l| l.contains(needle))
    }

    /// Index of the first line containing `needle`.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .position(|l| l.contains(needle))
    }
}

impl ConsoleSink for MemoryConsole {
    fn println(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}
