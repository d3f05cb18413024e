//! HTTP transport seam between the API client and the network.
//!
//! The client only ever issues GET requests; everything it needs from the
//! network is captured by [`Transport::get`], so tests can script responses
//! without a server.

use crate::error::{Error, Result};
use tracing::debug;

/// Production API root (the versioned REST surface)
pub const DEFAULT_BASE_URL: &str = "https://api.linkedin.com/v2";

/// A fully described GET request, relative to the transport's base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// Path below the base URL, already percent-encoded where needed
    pub path: String,
    /// Query parameters, percent-encoded by the transport
    pub params: Vec<(String, String)>,
    /// Query fragment sent verbatim, never percent-encoded
    pub raw_query: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// URL without the encoded parameters: base, path and the raw fragment
    pub fn base_url(&self, base: &str) -> String {
        let mut url = format!("{}/{}", base.trim_end_matches('/'), self.path);
        if let Some(raw) = &self.raw_query {
            url.push('?');
            url.push_str(raw);
        }
        url
    }
}

/// Raw HTTP response: status code and undecoded body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Issues GET requests. Non-2xx statuses are returned, not raised; only
/// network-level failures become errors.
pub trait Transport {
    fn get(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// Blocking transport backed by a `ureq` agent
pub struct UreqTransport {
    agent: ureq::Agent,
    base_url: String,
}

impl UreqTransport {
    pub fn new() -> Self {
        UreqTransport::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        // Status codes are inspected by the client, so they must not be errors here
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        UreqTransport {
            agent,
            base_url: base_url.into(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        UreqTransport::new()
    }
}

impl Transport for UreqTransport {
    fn get(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = request.base_url(&self.base_url);
        debug!(url = %url, params = ?request.params, "GET");

        let mut builder = self.agent.get(url.as_str());
        for (key, value) in &request.params {
            builder = builder.query(key, value);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let response = builder.call().map_err(|err| Error::Transport {
            status: None,
            reason: format!("GET {url} failed: {err}"),
        })?;
        let status = response.status().as_u16();
        let body = response.into_body().read_to_string().map_err(|err| Error::Transport {
            status: Some(status),
            reason: format!("failed reading response body of {url}: {err}"),
        })?;

        Ok(ApiResponse { status, body })
    }
}
