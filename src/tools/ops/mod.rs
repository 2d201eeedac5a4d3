//! Uptrace operations exposed as tools.
//!
//! Three families: spans and traces, dashboards, metrics and monitors. Each
//! operation is a unit struct implementing
//! [`Operation`](crate::tools::handler::Operation); [`build_registry`]
//! registers all of them in listing order.

pub mod dashboards;
pub mod metrics;
pub mod spans;

use crate::tools::catalog::ToolRegistry;
use crate::tools::defaults::{DefaultPolicy, TimeRange};
use crate::tools::handler::ToolContext;
use crate::tools::request::NormalizedRequest;
use crate::types::Result;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Deserialize;

/// Optional `[time_gte, time_lt)` bounds accepted by time-scoped tools.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct TimeWindow {
    /// Start of the time range, RFC 3339. Defaults to now minus the configured window.
    #[serde(default, alias = "time_start")]
    pub time_gte: Option<DateTime<Utc>>,
    /// End of the time range, RFC 3339. Defaults to now.
    #[serde(default, alias = "time_end")]
    pub time_lt: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn resolve(&self, policy: &DefaultPolicy) -> TimeRange {
        policy.time_range(self.time_gte, self.time_lt)
    }
}

/// Span duration bounds in nanoseconds. Non-positive values are ignored.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct DurationFilter {
    /// Only spans lasting at least this long (nanoseconds).
    #[serde(default)]
    pub duration_gte: Option<i64>,
    /// Only spans shorter than this (nanoseconds).
    #[serde(default)]
    pub duration_lt: Option<i64>,
}

impl DurationFilter {
    pub fn apply(&self, request: NormalizedRequest) -> NormalizedRequest {
        request
            .filter("duration_gte", positive(self.duration_gte))
            .filter("duration_lt", positive(self.duration_lt))
    }
}

fn positive(value: Option<i64>) -> Option<i64> {
    value.filter(|v| *v > 0)
}

/// Build the registry with every operation, in listing order.
///
/// Fails if two operations share a name.
pub fn build_registry(ctx: ToolContext) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    ctx.register::<spans::ListSpans>(&mut registry)?;
    ctx.register::<spans::ListSpanGroups>(&mut registry)?;
    ctx.register::<spans::PublicListSpans>(&mut registry)?;
    ctx.register::<spans::PublicListSpanGroups>(&mut registry)?;
    ctx.register::<spans::ListTraces>(&mut registry)?;
    ctx.register::<spans::ListTraceGroups>(&mut registry)?;
    ctx.register::<spans::Timeseries>(&mut registry)?;
    ctx.register::<spans::Quantiles>(&mut registry)?;

    ctx.register::<dashboards::ListDashboards>(&mut registry)?;
    ctx.register::<dashboards::GetDashboard>(&mut registry)?;
    ctx.register::<dashboards::GetDashboardYaml>(&mut registry)?;
    ctx.register::<dashboards::CreateDashboard>(&mut registry)?;
    ctx.register::<dashboards::UpdateDashboardYaml>(&mut registry)?;
    ctx.register::<dashboards::DeleteDashboard>(&mut registry)?;
    ctx.register::<dashboards::ListDashboardTags>(&mut registry)?;
    ctx.register::<dashboards::ListDashboardTemplates>(&mut registry)?;
    ctx.register::<dashboards::GetDashboardTemplate>(&mut registry)?;

    ctx.register::<metrics::ListMonitors>(&mut registry)?;
    ctx.register::<metrics::ExploreMetrics>(&mut registry)?;
    ctx.register::<metrics::ListMetricAttributes>(&mut registry)?;
    ctx.register::<metrics::ListMetricAttributeValues>(&mut registry)?;

    tracing::debug!(tools = registry.len(), "tool registry built");
    Ok(registry)
}
