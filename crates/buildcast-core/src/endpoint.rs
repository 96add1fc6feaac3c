//! Endpoint resolution from the delimited URL configuration strings.

use crate::config::ENDPOINT_SEPARATOR;

/// Path inserted between a dashboard base URL and a dashboard id.
pub const DASHBOARD_PATH: &str = "/dashboards/";

/// One configured dashboard service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub service_url: String,
    /// Human-facing dashboard base URL at the same raw list slot
    pub dashboard_url: Option<String>,
    /// Raw slot in the configured service URL list
    pub index: usize,
}

impl Endpoint {
    /// Deep link to a dashboard, if this endpoint has a dashboard URL.
    pub fn dashboard_link(&self, dashboard_id: &str) -> Option<String> {
        let base = self.dashboard_url.as_deref()?;
        if dashboard_id.is_empty() {
            return None;
        }
        Some(format!("{base}{DASHBOARD_PATH}{dashboard_id}"))
    }

    /// 1-based position used in console lines.
    pub fn ordinal(&self) -> usize {
        self.index + 1
    }
}

/// Ordered endpoints for one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointSet {
    endpoints: Vec<Endpoint>,
}

impl EndpointSet {
    /// Split both lists on [`ENDPOINT_SEPARATOR`].
    ///
    /// Blank service slots are dropped, but dashboard URLs pair with the raw
    /// service slot index, so `"a,,b"` with `"x,y,z"` pairs `b` with `z`.
    pub fn resolve(api_urls: &str, dashboard_urls: &str) -> Self {
        let dashboards: Vec<&str> = dashboard_urls.split(ENDPOINT_SEPARATOR).collect();

        let endpoints = api_urls
            .split(ENDPOINT_SEPARATOR)
            .enumerate()
            .filter_map(|(index, raw)| {
                let service_url = raw.trim();
                if service_url.is_empty() {
                    return None;
                }
                let dashboard_url = dashboards
                    .get(index)
                    .map(|d| d.trim())
                    .filter(|d| !d.is_empty())
                    .map(str::to_string);
                Some(Endpoint {
                    service_url: service_url.to_string(),
                    dashboard_url,
                    index,
                })
            })
            .collect();

        Self { endpoints }
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Endpoint> {
        self.endpoints.iter()
    }
}

impl<'a> IntoIterator for &'a EndpointSet {
    type Item = &'a Endpoint;
    type IntoIter = std::slice::Iter<'a, Endpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Resolve an href from the runtime API against its instance base URL.
///
/// Absolute hrefs pass through unchanged; relative ones are joined on a
/// single `/`.
pub fn resolve_href(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        href.trim_start_matches('/')
    )
}
