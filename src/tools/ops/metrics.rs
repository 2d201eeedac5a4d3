//! Monitors, metric exploration and metric attributes.

use super::dashboards::ProjectInput;
use super::TimeWindow;
use crate::tools::catalog::ToolHints;
use crate::tools::defaults::DefaultPolicy;
use crate::tools::handler::Operation;
use crate::tools::request::{Endpoint, NormalizedRequest};
use crate::types::Result;
use crate::validation::require_non_empty;
use schemars::JsonSchema;
use serde::Deserialize;

const MONITORS: Endpoint = Endpoint::get("/api/v1/metrics/{project_id}/monitors");
const EXPLORE: Endpoint = Endpoint::get("/api/v1/metrics/{project_id}/explore");
const ATTRIBUTES: Endpoint = Endpoint::get("/api/v1/metrics/{project_id}/attributes");
const ATTRIBUTE_VALUES: Endpoint = Endpoint::get("/api/v1/metrics/{project_id}/attributes/{id}/values");

#[derive(Debug)]
pub struct ListMonitors;

impl Operation for ListMonitors {
    type Input = ProjectInput;

    const NAME: &'static str = "list_monitors";
    const TITLE: &'static str = "List monitors";
    const DESCRIPTION: &'static str =
        "List monitors from Uptrace. Use to view configured alerts and monitoring rules.";
    const HINTS: ToolHints = ToolHints::READ;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        Ok(NormalizedRequest::new(MONITORS, policy.project_id(input.project_id)))
    }
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ExploreMetricsInput {
    /// Uptrace project ID. Defaults to the configured project.
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(flatten)]
    pub window: TimeWindow,
    /// Substring to match against metric names and descriptions.
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug)]
pub struct ExploreMetrics;

impl Operation for ExploreMetrics {
    type Input = ExploreMetricsInput;

    const NAME: &'static str = "explore_metrics";
    const TITLE: &'static str = "Explore metrics";
    const DESCRIPTION: &'static str = "List metrics reported to the project with their instrument, unit, \
        description and number of timeseries. Use it to discover metric names before querying dashboards. \
        Documentation: https://uptrace.dev/features/metrics";
    const HINTS: ToolHints = ToolHints::READ;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        Ok(NormalizedRequest::new(EXPLORE, policy.project_id(input.project_id))
            .time_range(input.window.resolve(policy))
            .filter("search", input.search))
    }
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct MetricAttributesInput {
    /// Uptrace project ID. Defaults to the configured project.
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(flatten)]
    pub window: TimeWindow,
    /// Restrict to attributes of these metrics.
    #[serde(default)]
    pub metric: Vec<String>,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug)]
pub struct ListMetricAttributes;

impl Operation for ListMetricAttributes {
    type Input = MetricAttributesInput;

    const NAME: &'static str = "list_metric_attributes";
    const TITLE: &'static str = "List metric attributes";
    const DESCRIPTION: &'static str = "List attribute keys found on metrics, optionally restricted to \
        specific metrics. Use the keys in `where` and `group by` clauses of metric queries. \
        Documentation: https://uptrace.dev/features/metrics";
    const HINTS: ToolHints = ToolHints::READ;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        Ok(NormalizedRequest::new(ATTRIBUTES, policy.project_id(input.project_id))
            .time_range(input.window.resolve(policy))
            .filter_all("metric", input.metric)
            .filter("search", input.search))
    }
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct MetricAttributeValuesInput {
    /// Uptrace project ID. Defaults to the configured project.
    #[serde(default)]
    pub project_id: Option<i64>,
    /// Attribute key, e.g. `host_name`.
    #[serde(default)]
    pub attr_key: Option<String>,
    #[serde(flatten)]
    pub window: TimeWindow,
    /// Restrict to values seen on these metrics.
    #[serde(default)]
    pub metric: Vec<String>,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug)]
pub struct ListMetricAttributeValues;

impl Operation for ListMetricAttributeValues {
    type Input = MetricAttributeValuesInput;

    const NAME: &'static str = "list_metric_attribute_values";
    const TITLE: &'static str = "List attribute values";
    const DESCRIPTION: &'static str = "List the distinct values of one metric attribute key. \
        Documentation: https://uptrace.dev/features/metrics";
    const HINTS: ToolHints = ToolHints::READ;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        let attr_key = require_non_empty(input.attr_key, "attr_key")?;
        Ok(NormalizedRequest::new(ATTRIBUTE_VALUES, policy.project_id(input.project_id))
            .resource(attr_key)
            .time_range(input.window.resolve(policy))
            .filter_all("metric", input.metric)
            .filter("search", input.search))
    }
}
