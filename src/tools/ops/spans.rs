//! Spans, span groups, traces and time-bucketed span aggregations.

use super::{DurationFilter, TimeWindow};
use crate::tools::catalog::ToolHints;
use crate::tools::defaults::DefaultPolicy;
use crate::tools::handler::Operation;
use crate::tools::request::{Endpoint, NormalizedRequest};
use crate::types::Result;
use crate::validation::require_parallel_lengths;
use schemars::JsonSchema;
use serde::Deserialize;

const SPANS: Endpoint = Endpoint::get("/api/v1/tracing/{project_id}/spans").with_time_keys("time_start", "time_end");
const SPAN_GROUPS: Endpoint =
    Endpoint::get("/api/v1/tracing/{project_id}/groups").with_time_keys("time_start", "time_end");
const PUBLIC_SPANS: Endpoint = Endpoint::get("/api/v1/tracing/{project_id}/public/spans");
const PUBLIC_SPAN_GROUPS: Endpoint = Endpoint::get("/api/v1/tracing/{project_id}/public/groups");
const TRACES: Endpoint = Endpoint::get("/api/v1/tracing/{project_id}/traces");
const TRACE_GROUPS: Endpoint = Endpoint::get("/api/v1/tracing/{project_id}/trace-groups");
const TIMESERIES: Endpoint = Endpoint::get("/api/v1/tracing/{project_id}/timeseries");
const QUANTILES: Endpoint = Endpoint::get("/api/v1/tracing/{project_id}/percentiles");

// =============================================================================
// list_spans
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListSpansInput {
    /// Uptrace project ID. Defaults to the configured project.
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(flatten)]
    pub window: TimeWindow,
    /// Maximum number of spans to return (capped at 10000).
    #[serde(default)]
    pub limit: Option<u64>,
    /// UQL filter, e.g. `where _status_code = "error"`.
    #[serde(default)]
    pub query: Option<String>,
    /// Full-text search over span names and attributes.
    #[serde(default)]
    pub search: Option<String>,
    /// Span system, e.g. `httpserver:all` or `db:postgresql`.
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub span_id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(flatten)]
    pub duration: DurationFilter,
    /// Attribute to sort by, e.g. `_dur_ms`.
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_desc: Option<bool>,
}

#[derive(Debug)]
pub struct ListSpans;

impl Operation for ListSpans {
    type Input = ListSpansInput;

    const NAME: &'static str = "list_spans";
    const TITLE: &'static str = "List spans";
    const DESCRIPTION: &'static str = "List spans from Uptrace for distributed tracing analysis. \
        Spans represent individual operations in a trace. \
        Use to search traces by trace_id, filter by time range, analyze service performance. \
        Documentation: https://uptrace.dev/llms.txt#features > 'Querying Spans and Logs'";
    const HINTS: ToolHints = ToolHints::READ;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        let mut request = NormalizedRequest::new(SPANS, policy.project_id(input.project_id))
            .time_range(input.window.resolve(policy))
            .limit(policy.limit(input.limit));
        if let Some(query) = input.query {
            request = request.query(query);
        }
        let request = request
            .filter("search", input.search)
            .filter("system", input.system)
            .filter("trace_id", input.trace_id)
            .filter("id", input.span_id)
            .filter("parent_id", input.parent_id);
        Ok(input
            .duration
            .apply(request)
            .filter("sort_by", input.sort_by)
            .filter("sort_desc", input.sort_desc))
    }
}

// =============================================================================
// list_span_groups / public_list_span_groups
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct SpanGroupsInput {
    /// Uptrace project ID. Defaults to the configured project.
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(flatten)]
    pub window: TimeWindow,
    /// Maximum number of groups to return (capped at 10000).
    #[serde(default)]
    pub limit: Option<u64>,
    /// UQL aggregation, e.g. `where _status_code = "error" | group by service_name`.
    #[serde(default)]
    pub query: Option<String>,
    /// Full-text search over span names and attributes.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(flatten)]
    pub duration: DurationFilter,
}

fn span_groups(endpoint: Endpoint, input: SpanGroupsInput, policy: &DefaultPolicy) -> NormalizedRequest {
    let request = NormalizedRequest::new(endpoint, policy.project_id(input.project_id))
        .time_range(input.window.resolve(policy))
        .limit(policy.limit(input.limit))
        .query(policy.query(input.query))
        .filter("search", input.search);
    input.duration.apply(request)
}

#[derive(Debug)]
pub struct ListSpanGroups;

impl Operation for ListSpanGroups {
    type Input = SpanGroupsInput;

    const NAME: &'static str = "list_span_groups";
    const TITLE: &'static str = "List span groups";
    const DESCRIPTION: &'static str = "Aggregate spans using UQL (Uptrace Query Language). \
        Use this tool to group and analyze spans by attributes like host_name, service_name, etc. \
        UQL query examples: \
        \"group by host_name\" groups spans by hostname; \
        \"where _status_code = 'error' | group by service_name\" groups errors by service; \
        \"group by service_name | having count() > 100\" finds services with more than 100 spans; \
        \"where _dur_ms > 1s | group by _name\" finds slow operations. \
        Documentation: https://uptrace.dev/features/querying/grouping";
    const HINTS: ToolHints = ToolHints::READ;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        Ok(span_groups(SPAN_GROUPS, input, policy))
    }
}

#[derive(Debug)]
pub struct PublicListSpanGroups;

impl Operation for PublicListSpanGroups {
    type Input = SpanGroupsInput;

    const NAME: &'static str = "public_list_span_groups";
    const TITLE: &'static str = "List span groups (public API)";
    const DESCRIPTION: &'static str = "List span groups using the stable public API. \
        Use this for basic span group browsing with search and duration filtering. \
        For advanced aggregation with UQL queries (GROUP BY, HAVING, aggregate functions), \
        use list_span_groups instead. \
        Documentation: https://uptrace.dev/features/querying/grouping";
    const HINTS: ToolHints = ToolHints::READ;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        Ok(span_groups(PUBLIC_SPAN_GROUPS, input, policy))
    }
}

// =============================================================================
// public_list_spans
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct PublicListSpansInput {
    /// Uptrace project ID. Defaults to the configured project.
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(flatten)]
    pub window: TimeWindow,
    /// Maximum number of spans to return (capped at 10000).
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub trace_id: Option<String>,
    /// Span ID.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug)]
pub struct PublicListSpans;

impl Operation for PublicListSpans {
    type Input = PublicListSpansInput;

    const NAME: &'static str = "public_list_spans";
    const TITLE: &'static str = "List spans (public API)";
    const DESCRIPTION: &'static str = "List spans using the stable public API. \
        Use this for simple span lookups by trace_id, span ID, or parent_id. \
        Best for retrieving known spans when you already have an ID. \
        For advanced filtering with UQL queries (WHERE, search, system filtering), use list_spans instead. \
        Documentation: https://uptrace.dev/features/querying/spans";
    const HINTS: ToolHints = ToolHints::READ;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        Ok(NormalizedRequest::new(PUBLIC_SPANS, policy.project_id(input.project_id))
            .time_range(input.window.resolve(policy))
            .limit(policy.limit(input.limit))
            .filter("trace_id", input.trace_id)
            .filter("id", input.id)
            .filter("parent_id", input.parent_id))
    }
}

// =============================================================================
// list_traces / list_trace_groups
// =============================================================================

/// Correlated sub-queries: `query[i]` runs against `system[i]` under `alias[i]`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct TraceQueryInput {
    /// Uptrace project ID. Defaults to the configured project.
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(flatten)]
    pub window: TimeWindow,
    /// Maximum number of rows to return (capped at 10000).
    #[serde(default)]
    pub limit: Option<u64>,
    /// UQL sub-queries, one per alias.
    #[serde(default)]
    pub query: Vec<String>,
    /// Sub-query aliases. One must be `root`.
    #[serde(default)]
    pub alias: Vec<String>,
    /// Span systems, e.g. `spans:all`, `httpserver:all`, `log:error`.
    #[serde(default)]
    pub system: Vec<String>,
    /// Sort newest first (the backend default).
    #[serde(default)]
    pub sort_desc: Option<bool>,
}

fn trace_query(endpoint: Endpoint, input: TraceQueryInput, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
    require_parallel_lengths(&[
        ("query", input.query.len()),
        ("alias", input.alias.len()),
        ("system", input.system.len()),
    ])?;
    Ok(NormalizedRequest::new(endpoint, policy.project_id(input.project_id))
        .time_range(input.window.resolve(policy))
        .limit(policy.limit(input.limit))
        .filter_all("query", input.query)
        .filter_all("alias", input.alias)
        .filter_all("system", input.system)
        .filter("sort_desc", input.sort_desc))
}

#[derive(Debug)]
pub struct ListTraces;

impl Operation for ListTraces {
    type Input = TraceQueryInput;

    const NAME: &'static str = "list_traces";
    const TITLE: &'static str = "List traces";
    const DESCRIPTION: &'static str = "List individual traces using correlated sub-queries. \
        Use this to find specific traces matching complex multi-span criteria. \
        Requires parallel arrays: query[], alias[], system[] with matching lengths. \
        One alias must be 'root' to identify the root span query. \
        Systems: spans:all, httpserver:all, db:postgresql, log:error, etc. \
        Returns root spans for matching traces sorted by time (DESC by default). \
        Use list_trace_groups instead when you need aggregated trace metrics. \
        Documentation: https://uptrace.dev/features/querying/spans";
    const HINTS: ToolHints = ToolHints::READ;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        trace_query(TRACES, input, policy)
    }
}

#[derive(Debug)]
pub struct ListTraceGroups;

impl Operation for ListTraceGroups {
    type Input = TraceQueryInput;

    const NAME: &'static str = "list_trace_groups";
    const TITLE: &'static str = "List trace groups";
    const DESCRIPTION: &'static str = "Aggregate traces into groups using correlated sub-queries. \
        Use this to find trace patterns and get aggregated trace metrics. \
        Requires parallel arrays: query[], alias[], system[] with matching lengths. \
        One alias must be 'root' to identify the root span query. \
        Returns grouped rows with dynamic columns. \
        Use list_traces instead when you need individual trace details. \
        Documentation: https://uptrace.dev/features/querying/spans";
    const HINTS: ToolHints = ToolHints::READ;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        trace_query(TRACE_GROUPS, input, policy)
    }
}

// =============================================================================
// timeseries / quantiles
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct TimeseriesInput {
    /// Uptrace project ID. Defaults to the configured project.
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(flatten)]
    pub window: TimeWindow,
    /// Maximum number of groups to return (capped at 10000).
    #[serde(default)]
    pub limit: Option<u64>,
    /// UQL aggregation, e.g. `perMin(count()) | group by service_name`.
    #[serde(default)]
    pub query: Option<String>,
    /// Aggregate columns to include in the timeseries.
    #[serde(default)]
    pub column: Vec<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(flatten)]
    pub duration: DurationFilter,
}

#[derive(Debug)]
pub struct Timeseries;

impl Operation for Timeseries {
    type Input = TimeseriesInput;

    const NAME: &'static str = "timeseries";
    const TITLE: &'static str = "Query timeseries";
    const DESCRIPTION: &'static str = "Query time-bucketed aggregation data for spans. \
        Use this to analyze trends over time, detect anomalies, or build charts. \
        Use a UQL aggregation query (e.g. 'perMin(count()) | group by service_name') \
        with aggregate functions: count(), avg(), sum(), p50(), p90(), p99(), etc. \
        Use the 'column' parameter to select specific aggregate columns. \
        Returns groups with arrays of float values aligned with the time array. \
        Use quantiles instead when you only need latency percentiles. \
        Documentation: https://uptrace.dev/features/querying/spans";
    const HINTS: ToolHints = ToolHints::READ;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        let request = NormalizedRequest::new(TIMESERIES, policy.project_id(input.project_id))
            .time_range(input.window.resolve(policy))
            .limit(policy.limit(input.limit))
            .query(policy.query(input.query))
            .filter_all("column", input.column)
            .filter("search", input.search)
            .filter("system", input.system);
        Ok(input.duration.apply(request))
    }
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct QuantilesInput {
    /// Uptrace project ID. Defaults to the configured project.
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(flatten)]
    pub window: TimeWindow,
    #[serde(default)]
    pub limit: Option<u64>,
    /// UQL filter, e.g. `where service_name = 'myservice'`.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(flatten)]
    pub duration: DurationFilter,
}

#[derive(Debug)]
pub struct Quantiles;

impl Operation for Quantiles {
    type Input = QuantilesInput;

    const NAME: &'static str = "quantiles";
    const TITLE: &'static str = "Query quantiles";
    const DESCRIPTION: &'static str = "Query duration percentiles (p50, p90, p99) and count/error rate over time. \
        Use this to identify latency outliers, track performance degradation, or compare SLO compliance. \
        Returns named timeseries: count, countPerMin, errorCount, errorCountPerMin, \
        durationP50, durationP90, durationP99, durationMax. \
        Use timeseries instead when you need custom aggregation queries with GROUP BY. \
        Documentation: https://uptrace.dev/features/querying/spans";
    const HINTS: ToolHints = ToolHints::READ;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        let request = NormalizedRequest::new(QUANTILES, policy.project_id(input.project_id))
            .time_range(input.window.resolve(policy))
            .limit(policy.limit(input.limit))
            .query(policy.query(input.query))
            .filter("search", input.search)
            .filter("system", input.system);
        Ok(input.duration.apply(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::handler::parse_arguments;
    use crate::types::{Error, ValidationKind};
    use chrono::Duration;
    use serde_json::json;

    fn policy() -> DefaultPolicy {
        DefaultPolicy::new(7, std::time::Duration::from_secs(3600), 100, "group by _group_id").unwrap()
    }

    fn normalize<O: Operation>(args: serde_json::Value) -> Result<NormalizedRequest> {
        O::normalize(parse_arguments(args)?, &policy())
    }

    #[test]
    fn test_list_spans_defaults() {
        let req = normalize::<ListSpans>(json!({})).unwrap();
        let range = req.time_range.unwrap();

        assert_eq!(req.project_id.get(), 7);
        assert_eq!(req.limit, Some(100));
        assert_eq!(range.end - range.start, Duration::hours(1));
        // list_spans only forwards a query the caller gave.
        assert_eq!(req.query, None);
    }

    #[test]
    fn test_list_spans_passthrough_filters() {
        let req = normalize::<ListSpans>(json!({
            "limit": 50000,
            "trace_id": "4bf92f3577b34da6",
            "span_id": "00f067aa0ba902b7",
            "system": "httpserver:all",
            "duration_gte": 0,
            "duration_lt": 5000,
        }))
        .unwrap();

        assert_eq!(req.limit, Some(10_000));
        assert_eq!(req.filter_value("trace_id"), Some("4bf92f3577b34da6"));
        assert_eq!(req.filter_value("id"), Some("00f067aa0ba902b7"));
        assert_eq!(req.filter_value("system"), Some("httpserver:all"));
        assert_eq!(req.filter_value("duration_gte"), None);
        assert_eq!(req.filter_value("duration_lt"), Some("5000"));
    }

    #[test]
    fn test_limit_beyond_u32_is_clamped() {
        let req = normalize::<ListSpans>(json!({"limit": 5_000_000_000u64})).unwrap();
        assert_eq!(req.limit, Some(10_000));

        let req = normalize::<ListTraces>(json!({"limit": u64::MAX})).unwrap();
        assert_eq!(req.limit, Some(10_000));
    }

    #[test]
    fn test_span_groups_use_default_query() {
        let req = normalize::<ListSpanGroups>(json!({"duration_gte": -1})).unwrap();
        assert_eq!(req.query.as_deref(), Some("group by _group_id"));
        assert_eq!(req.filter_value("duration_gte"), None);
        assert_eq!(req.endpoint.time_keys, ("time_start", "time_end"));

        let req = normalize::<ListSpanGroups>(json!({"query": "group by service_name"})).unwrap();
        assert_eq!(req.query.as_deref(), Some("group by service_name"));
    }

    #[test]
    fn test_public_endpoints_use_gte_lt_keys() {
        let call = normalize::<PublicListSpans>(json!({"id": "abc"}))
            .unwrap()
            .to_api_call()
            .unwrap();
        assert_eq!(call.path(), "/api/v1/tracing/7/public/spans");
        assert_eq!(call.query[0].0, "time_gte");
        assert_eq!(call.query[1].0, "time_lt");
    }

    #[test]
    fn test_traces_parallel_arrays_must_match() {
        let err = normalize::<ListTraces>(json!({
            "query": ["where _status_code = 'error'", ""],
            "alias": ["root"],
            "system": ["httpserver:all", "spans:all"],
        }))
        .unwrap_err();
        match err {
            Error::Validation(v) => {
                assert_eq!(v.kind, ValidationKind::Malformed);
                assert_eq!(v.field, "alias");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_trace_groups_repeat_array_keys() {
        let call = normalize::<ListTraceGroups>(json!({
            "query": ["", "where db_system = 'postgresql'"],
            "alias": ["root", "db"],
            "system": ["httpserver:all", "db:all"],
            "sort_desc": false,
        }))
        .unwrap()
        .to_api_call()
        .unwrap();

        assert_eq!(call.path(), "/api/v1/tracing/7/trace-groups");
        let aliases: Vec<&str> = call
            .query
            .iter()
            .filter(|(k, _)| k == "alias")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(aliases, vec!["root", "db"]);
        assert!(call.query.contains(&("sort_desc".to_string(), "false".to_string())));
    }

    #[test]
    fn test_timeseries_columns() {
        let req = normalize::<Timeseries>(json!({
            "query": "perMin(count()) | group by service_name",
            "column": ["perMin(count())"],
        }))
        .unwrap();
        assert_eq!(req.filter_value("column"), Some("perMin(count())"));
        assert_eq!(req.query.as_deref(), Some("perMin(count()) | group by service_name"));
    }

    #[test]
    fn test_quantiles_explicit_project() {
        let req = normalize::<Quantiles>(json!({"project_id": 12})).unwrap();
        assert_eq!(req.to_api_call().unwrap().path(), "/api/v1/tracing/12/percentiles");
    }
}
