//! Organization-management API client
//!
//! Wraps a [`Transport`] with authentication, protocol-version headers,
//! error-envelope decoding and pagination. Collection endpoints come back as
//! lazy [`Paginated`] sequences; singular resources as decoded JSON values.

pub mod pagination;
pub mod transport;

pub use pagination::{Page, Paginated, Paging};
pub use transport::{ApiRequest, ApiResponse, Transport, UreqTransport, DEFAULT_BASE_URL};

use crate::error::{Error, Result};
use crate::models::{StandardizedDataType, TimeIntervals, Urn};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;
use tracing::debug;

/// Protocol-version headers required on every request
pub const PROTOCOL_HEADERS: [(&str, &str); 2] = [
    ("X-Restli-Protocol-Version", "2.0.0"),
    ("LinkedIn-Version", "202208"),
];

pub const ENDPOINT_ORG: &str = "organizations";
pub const ENDPOINT_ORG_ACL: &str = "organizationAcls";
pub const ENDPOINT_ORG_PAGE_STATS: &str = "organizationPageStatistics";
pub const ENDPOINT_ORG_FOLLOWER_STATS: &str = "organizationalEntityFollowerStatistics";
pub const ENDPOINT_ORG_SHARE_STATS: &str = "organizationalEntityShareStatistics";
pub const ENDPOINT_POSTS: &str = "posts";
pub const ENDPOINT_SOCIAL_ACTIONS: &str = "socialActions";

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const POSTS_PAGE_SIZE: usize = 100;
pub const STANDARDIZED_DATA_PAGE_SIZE: usize = 100;

/// Path plus query of one API call, without pagination parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: String,
    pub params: Vec<(String, String)>,
    pub raw_query: Option<String>,
}

impl Endpoint {
    pub fn new(path: impl Into<String>) -> Self {
        Endpoint {
            path: path.into(),
            params: Vec::new(),
            raw_query: None,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Attach `timeIntervals=...` unencoded; the API rejects the encoded form
    pub fn time_intervals(mut self, intervals: Option<TimeIntervals>) -> Self {
        if let Some(intervals) = intervals {
            self.raw_query = Some(format!("timeIntervals={}", intervals.to_url_string()));
        }
        self
    }
}

/// Bytes escaped in a single path segment: everything but RFC 3986 unreserved
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Percent-encode a value used as a single path segment (e.g. a post URN)
pub fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Authenticated client over any [`Transport`]
pub struct LinkedInClient<T: Transport = UreqTransport> {
    transport: T,
    access_token: String,
}

impl LinkedInClient<UreqTransport> {
    pub fn new(access_token: impl Into<String>) -> Self {
        LinkedInClient::with_transport(UreqTransport::new(), access_token)
    }
}

impl<T: Transport> LinkedInClient<T> {
    pub fn with_transport(transport: T, access_token: impl Into<String>) -> Self {
        LinkedInClient {
            transport,
            access_token: access_token.into(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![(
            "Authorization".to_string(),
            format!("Bearer {}", self.access_token),
        )];
        headers.extend(
            PROTOCOL_HEADERS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        headers
    }

    fn send(&self, endpoint: &Endpoint, extra_params: Vec<(String, String)>) -> Result<Value> {
        let mut params = endpoint.params.clone();
        params.extend(extra_params);
        let request = ApiRequest {
            path: endpoint.path.clone(),
            params,
            raw_query: endpoint.raw_query.clone(),
            headers: self.headers(),
        };
        let response = self.transport.get(&request)?;
        decode_response(&endpoint.path, response)
    }

    /// GET a singular resource
    pub fn get(&self, endpoint: &Endpoint) -> Result<Value> {
        self.send(endpoint, Vec::new())
    }

    /// Fetch exactly one page at a fixed offset and return the raw envelope
    pub fn fetch_page(&self, endpoint: &Endpoint, start: usize, count: usize) -> Result<Value> {
        if count == 0 {
            return Err(Error::Validation(format!(
                "page size for '{}' must be positive",
                endpoint.path
            )));
        }
        debug!(path = %endpoint.path, start, count, "fetching page");
        self.send(
            endpoint,
            vec![
                ("count".to_string(), count.to_string()),
                ("start".to_string(), start.to_string()),
            ],
        )
    }

    /// Every element of a collection endpoint, fetched lazily
    pub fn paginate(&self, endpoint: Endpoint, count: usize) -> Paginated<'_, T> {
        Paginated::new(self, endpoint, count)
    }

    pub fn organization(&self, organization_id: u64) -> Result<Value> {
        self.get(&Endpoint::new(format!("{ENDPOINT_ORG}/{organization_id}")))
    }

    pub fn organization_acls(&self, role: Option<&str>) -> Paginated<'_, T> {
        let mut endpoint = Endpoint::new(ENDPOINT_ORG_ACL);
        if let Some(role) = role {
            endpoint = endpoint.param("q", role);
        }
        self.paginate(endpoint, DEFAULT_PAGE_SIZE)
    }

    pub fn page_statistics(
        &self,
        organization: &Urn,
        time_intervals: Option<TimeIntervals>,
    ) -> Paginated<'_, T> {
        let endpoint = Endpoint::new(ENDPOINT_ORG_PAGE_STATS)
            .param("q", "organization")
            .param("organization", organization.to_string())
            .time_intervals(time_intervals);
        self.paginate(endpoint, DEFAULT_PAGE_SIZE)
    }

    pub fn follower_statistics(
        &self,
        organization: &Urn,
        time_intervals: Option<TimeIntervals>,
    ) -> Paginated<'_, T> {
        let endpoint = Endpoint::new(ENDPOINT_ORG_FOLLOWER_STATS)
            .param("q", "organizationalEntity")
            .param("organizationalEntity", organization.to_string())
            .time_intervals(time_intervals);
        self.paginate(endpoint, DEFAULT_PAGE_SIZE)
    }

    pub fn share_statistics(
        &self,
        organization: &Urn,
        time_intervals: Option<TimeIntervals>,
    ) -> Paginated<'_, T> {
        let endpoint = Endpoint::new(ENDPOINT_ORG_SHARE_STATS)
            .param("q", "organizationalEntity")
            .param("organizationalEntity", organization.to_string())
            .time_intervals(time_intervals);
        self.paginate(endpoint, DEFAULT_PAGE_SIZE)
    }

    pub fn posts_by_author(&self, author: &Urn, is_dsc: bool) -> Paginated<'_, T> {
        let endpoint = Endpoint::new(ENDPOINT_POSTS)
            .param("q", "author")
            .param("author", author.to_string())
            .param("isDsc", if is_dsc { "true" } else { "false" });
        self.paginate(endpoint, POSTS_PAGE_SIZE)
    }

    pub fn comments_on_post(&self, post_urn: &str) -> Paginated<'_, T> {
        let path = format!(
            "{ENDPOINT_SOCIAL_ACTIONS}/{}/comments",
            encode_path_segment(post_urn)
        );
        self.paginate(Endpoint::new(path), DEFAULT_PAGE_SIZE)
    }

    pub fn likes_on_post(&self, post_urn: &str) -> Paginated<'_, T> {
        let path = format!(
            "{ENDPOINT_SOCIAL_ACTIONS}/{}/likes",
            encode_path_segment(post_urn)
        );
        self.paginate(Endpoint::new(path), DEFAULT_PAGE_SIZE)
    }

    pub fn social_action_summary(&self, post_urn: &str) -> Result<Value> {
        self.get(&Endpoint::new(format!(
            "{ENDPOINT_SOCIAL_ACTIONS}/{}",
            encode_path_segment(post_urn)
        )))
    }

    pub fn standardized_data(&self, data_type: StandardizedDataType) -> Paginated<'_, T> {
        self.paginate(Endpoint::new(data_type.endpoint()), STANDARDIZED_DATA_PAGE_SIZE)
    }
}

/// Turn a raw response into JSON or the matching error
fn decode_response(path: &str, response: ApiResponse) -> Result<Value> {
    match response.status {
        200..=299 => serde_json::from_str(&response.body).map_err(|e| {
            Error::Format(format!("response of '{path}' is not valid JSON: {e}"))
        }),
        status @ 400..=403 => {
            let message = serde_json::from_str::<Value>(&response.body)
                .ok()
                .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_owned))
                .unwrap_or_else(|| response.body.trim().to_string());
            Err(Error::Client { status, message })
        }
        status => Err(Error::Transport {
            status: Some(status),
            reason: format!("GET '{path}' failed: {}", response.body.trim()),
        }),
    }
}
