//! Normalized backend requests.
//!
//! A [`NormalizedRequest`] is the fully-populated, per-call value produced by
//! a request normalizer: path parameters plus the query/filter section, with
//! every default already applied. [`NormalizedRequest::to_api_call`] renders
//! it against its static [`Endpoint`] into the wire-level [`ApiCall`] the
//! backend invoker sends.

use crate::tools::defaults::TimeRange;
use crate::types::{BackendError, ProjectId};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Display;

/// Content type of YAML dashboard bodies.
pub const YAML_CONTENT_TYPE: &str = "application/yaml";

const PROJECT_SEGMENT: &str = "{project_id}";
const RESOURCE_SEGMENT: &str = "{id}";

// =============================================================================
// Endpoint description
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// How a successful response body is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// JSON document (an empty body is accepted as "no payload").
    Json,
    /// Raw text passed through verbatim (dashboard YAML).
    Text,
}

/// Static description of one Uptrace API operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub method: HttpMethod,
    /// Path template with `{project_id}` and optionally `{id}` segments.
    pub path: &'static str,
    /// Wire names of the lower and upper time bounds.
    pub time_keys: (&'static str, &'static str),
    pub response: ResponseKind,
}

impl Endpoint {
    pub const fn get(path: &'static str) -> Self {
        Self {
            method: HttpMethod::Get,
            path,
            time_keys: ("time_gte", "time_lt"),
            response: ResponseKind::Json,
        }
    }

    pub const fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub const fn with_time_keys(mut self, start: &'static str, end: &'static str) -> Self {
        self.time_keys = (start, end);
        self
    }

    pub const fn with_text_response(mut self) -> Self {
        self.response = ResponseKind::Text;
        self
    }
}

// =============================================================================
// Normalized request
// =============================================================================

/// Fully-specified request for one backend operation.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    pub endpoint: Endpoint,
    pub project_id: ProjectId,
    /// Resource path segment (dashboard id, template id, attribute key).
    pub resource_id: Option<String>,
    pub time_range: Option<TimeRange>,
    pub limit: Option<u32>,
    pub query: Option<String>,
    /// Operation-specific filters, passed through in order.
    pub filters: Vec<(String, String)>,
    /// YAML body for dashboard create/update.
    pub body: Option<String>,
}

impl NormalizedRequest {
    pub fn new(endpoint: Endpoint, project_id: ProjectId) -> Self {
        Self {
            endpoint,
            project_id,
            resource_id: None,
            time_range: None,
            limit: None,
            query: None,
            filters: Vec::new(),
            body: None,
        }
    }

    pub fn resource(mut self, id: impl Display) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn query(mut self, query: String) -> Self {
        self.query = Some(query);
        self
    }

    pub fn yaml_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a filter when the value is present.
    pub fn filter<T: Display>(mut self, key: &str, value: Option<T>) -> Self {
        if let Some(v) = value {
            self.filters.push((key.to_string(), v.to_string()));
        }
        self
    }

    /// Add a filter once per value (repeated query keys).
    pub fn filter_all<T: Display>(mut self, key: &str, values: impl IntoIterator<Item = T>) -> Self {
        for v in values {
            self.filters.push((key.to_string(), v.to_string()));
        }
        self
    }

    /// Look up the first filter value for `key`.
    pub fn filter_value(&self, key: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Render against the endpoint into a wire-level call.
    pub fn to_api_call(&self) -> Result<ApiCall, BackendError> {
        let mut path_segments = Vec::new();
        for segment in self.endpoint.path.split('/').filter(|s| !s.is_empty()) {
            let rendered = match segment {
                PROJECT_SEGMENT => self.project_id.to_string(),
                RESOURCE_SEGMENT => self.resource_id.clone().ok_or_else(|| {
                    BackendError::InvalidUrl(format!("{} requires a resource id", self.endpoint.path))
                })?,
                literal => literal.to_string(),
            };
            path_segments.push(rendered);
        }

        let mut query = Vec::new();
        if let Some(range) = &self.time_range {
            let (start_key, end_key) = self.endpoint.time_keys;
            query.push((start_key.to_string(), format_time(range.start)));
            query.push((end_key.to_string(), format_time(range.end)));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(q) = &self.query {
            query.push(("query".to_string(), q.clone()));
        }
        query.extend(self.filters.iter().cloned());

        Ok(ApiCall {
            method: self.endpoint.method,
            path_segments,
            query,
            body: self.body.clone().map(|text| RequestBody {
                content_type: YAML_CONTENT_TYPE,
                text,
            }),
            response: self.endpoint.response,
        })
    }
}

fn format_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

// =============================================================================
// Wire-level call
// =============================================================================

/// Raw text request body with an explicit content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBody {
    pub content_type: &'static str,
    pub text: String,
}

/// One outbound HTTP call, independent of any HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    pub method: HttpMethod,
    /// Unencoded path segments; the client percent-encodes them.
    pub path_segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub response: ResponseKind,
}

impl ApiCall {
    /// Human-readable path for logs and error messages.
    pub fn path(&self) -> String {
        format!("/{}", self.path_segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const SPANS: Endpoint = Endpoint::get("/api/v1/tracing/{project_id}/spans").with_time_keys("time_start", "time_end");
    const DASHBOARD_YAML: Endpoint = Endpoint::get("/api/v1/metrics/{project_id}/dashboards/{id}/yaml")
        .with_method(HttpMethod::Put);

    fn project() -> ProjectId {
        ProjectId::new(3).unwrap()
    }

    #[test]
    fn test_render_query_in_order() {
        let range = TimeRange {
            start: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap(),
        };
        let call = NormalizedRequest::new(SPANS, project())
            .time_range(range)
            .limit(50)
            .query("where _status_code = 'error'".to_string())
            .filter("trace_id", Some("abc"))
            .filter::<&str>("span_id", None)
            .to_api_call()
            .unwrap();

        assert_eq!(call.method, HttpMethod::Get);
        assert_eq!(call.path(), "/api/v1/tracing/3/spans");
        assert_eq!(
            call.query,
            vec![
                ("time_start".to_string(), "2024-05-01T10:00:00Z".to_string()),
                ("time_end".to_string(), "2024-05-01T11:00:00Z".to_string()),
                ("limit".to_string(), "50".to_string()),
                ("query".to_string(), "where _status_code = 'error'".to_string()),
                ("trace_id".to_string(), "abc".to_string()),
            ]
        );
        assert!(call.body.is_none());
    }

    #[test]
    fn test_render_resource_and_body() {
        let call = NormalizedRequest::new(DASHBOARD_YAML, project())
            .resource(12)
            .yaml_body("schema: v2".to_string())
            .to_api_call()
            .unwrap();

        assert_eq!(call.method, HttpMethod::Put);
        assert_eq!(call.path(), "/api/v1/metrics/3/dashboards/12/yaml");
        assert_eq!(
            call.body,
            Some(RequestBody {
                content_type: YAML_CONTENT_TYPE,
                text: "schema: v2".to_string(),
            })
        );
        assert!(call.query.is_empty());
    }

    #[test]
    fn test_missing_resource_is_rejected() {
        let err = NormalizedRequest::new(DASHBOARD_YAML, project()).to_api_call().unwrap_err();
        assert!(matches!(err, BackendError::InvalidUrl(_)));
    }

    #[test]
    fn test_repeated_filters() {
        let req = NormalizedRequest::new(SPANS, project()).filter_all("column", ["p50", "p99"]);
        assert_eq!(req.filter_value("column"), Some("p50"));
        assert_eq!(req.filters.len(), 2);
    }
}
