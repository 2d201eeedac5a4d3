//! Defaulting policy: fallback values for omitted tool arguments.
//!
//! Every request normalizer fills defaults through [`DefaultPolicy`] rather
//! than deriving them on its own. The policy is built once from the
//! configuration and is immutable afterwards; the only input that varies per
//! call is the wall clock.

use crate::types::{Config, Error, ProjectId, Result, LIMIT_CEILING, MAX_TIME_WINDOW};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Resolved `[start, end)` time range of a query.
///
/// `start < end` is not enforced: explicit caller bounds pass through as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }
}

/// Process-wide defaults for omitted tool arguments.
#[derive(Debug, Clone)]
pub struct DefaultPolicy {
    project_id: ProjectId,
    window: Duration,
    limit: u32,
    query: String,
}

impl DefaultPolicy {
    /// Build the policy from explicit values, rejecting ones no call could use.
    pub fn new(project_id: i64, window: std::time::Duration, limit: u32, query: impl Into<String>) -> Result<Self> {
        let project_id = ProjectId::new(project_id)
            .ok_or_else(|| Error::config("default project id cannot be zero"))?;
        if window.is_zero() {
            return Err(Error::config("default time window must be positive"));
        }
        if window > MAX_TIME_WINDOW {
            return Err(Error::config(format!("default time window out of range: {:?}", window)));
        }
        let window = Duration::from_std(window)
            .map_err(|e| Error::config(format!("default time window out of range: {}", e)))?;
        if limit == 0 || limit > LIMIT_CEILING {
            return Err(Error::config(format!(
                "default limit must be between 1 and {}, got {}",
                LIMIT_CEILING, limit
            )));
        }
        Ok(Self {
            project_id,
            window,
            limit,
            query: query.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.uptrace.project_id,
            config.defaults.time_window,
            config.defaults.limit,
            config.defaults.query.clone(),
        )
    }

    /// Caller's project id, or the configured default when absent or zero.
    pub fn project_id(&self, supplied: Option<i64>) -> ProjectId {
        supplied.and_then(ProjectId::new).unwrap_or(self.project_id)
    }

    /// Resolve a time range against the current wall clock.
    pub fn time_range(&self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> TimeRange {
        self.time_range_at(Utc::now(), start, end)
    }

    /// Resolve a time range against `now`.
    ///
    /// Each bound falls back independently: `end` to `now`, `start` to
    /// `now - window`. A bound at or before the Unix epoch counts as absent.
    pub fn time_range_at(
        &self,
        now: DateTime<Utc>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> TimeRange {
        let end = end.filter(is_set).unwrap_or(now);
        let start = start
            .filter(is_set)
            .unwrap_or_else(|| now.checked_sub_signed(self.window).unwrap_or(DateTime::<Utc>::MIN_UTC));
        let range = TimeRange { start, end };
        if range.is_inverted() {
            tracing::warn!(start = %range.start, end = %range.end, "time range start is after end, passing through");
        }
        range
    }

    /// Caller's limit clamped to [`LIMIT_CEILING`], or the configured default.
    /// Zero counts as absent.
    pub fn limit(&self, supplied: Option<u64>) -> u32 {
        match supplied {
            None | Some(0) => self.limit,
            Some(n) => u32::try_from(n).map_or(LIMIT_CEILING, |n| n.min(LIMIT_CEILING)),
        }
    }

    /// Caller's query string, or the configured default query.
    pub fn query(&self, supplied: Option<String>) -> String {
        supplied.unwrap_or_else(|| self.query.clone())
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

fn is_set(t: &DateTime<Utc>) -> bool {
    t.timestamp() > 0
}
