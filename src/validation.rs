//! Request validation utilities.
//!
//! Domain-specific required-field checks run by the request normalizers.
//! Structural schema validation of the argument payload is left to serde.

use crate::types::{DashboardId, Result, ValidationError};

/// Literal tokens a dashboard YAML body must contain.
pub const DASHBOARD_YAML_MARKERS: [&str; 4] = ["schema:", "name", "version", "tags"];

/// Minimal dashboard definition shown to callers who send a bad body.
pub const DASHBOARD_YAML_EXAMPLE: &str = "\
schema: v2
name: Service overview
version: 1
tags: [service]
grid_rows:
  - title: General
    items:
      - title: Requests per minute
        metrics:
          - uptrace_tracing_spans as $spans
        query:
          - perMin(sum($spans)) as requests
";

/// Validate that a string is present and not blank.
pub fn require_non_empty(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(ValidationError::missing(field, format!("{} cannot be empty", field)).into()),
    }
}

/// Validate a required positive id. Zero counts as absent.
pub fn require_id(value: Option<i64>, field: &str) -> Result<i64> {
    match value {
        None | Some(0) => Err(ValidationError::missing(field, format!("{} is required", field)).into()),
        Some(n) if n < 0 => Err(ValidationError::malformed(
            field,
            format!("{} must be positive, got {}", field, n),
        )
        .into()),
        Some(n) => Ok(n),
    }
}

pub fn require_dashboard_id(value: Option<i64>) -> Result<DashboardId> {
    let raw = require_id(value, "dashboard_id")?;
    DashboardId::new(raw)
        .ok_or_else(|| ValidationError::missing("dashboard_id", "dashboard_id is required").into())
}

/// Check the minimal shape of a YAML dashboard definition.
///
/// This is a loose precondition, not a schema validator: the body must be
/// non-empty, parse as YAML and contain every marker in
/// [`DASHBOARD_YAML_MARKERS`]. Uptrace performs the authoritative validation.
pub fn require_dashboard_yaml(body: Option<String>) -> Result<String> {
    let body = match body {
        Some(b) if !b.trim().is_empty() => b,
        _ => {
            return Err(ValidationError::missing("body", "YAML dashboard definition is required")
                .with_example(DASHBOARD_YAML_EXAMPLE)
                .into())
        }
    };

    let missing: Vec<&str> = DASHBOARD_YAML_MARKERS
        .iter()
        .copied()
        .filter(|marker| !body.contains(marker))
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::malformed(
            "body",
            format!(
                "YAML definition is missing {} (requires 'schema: v2' or 'schema: v3', 'name', 'version' and 'tags')",
                missing.join(", ")
            ),
        )
        .with_example(DASHBOARD_YAML_EXAMPLE)
        .into());
    }

    if let Err(e) = serde_yaml::from_str::<serde_yaml::Value>(&body) {
        return Err(ValidationError::malformed("body", format!("not valid YAML: {}", e))
            .with_example(DASHBOARD_YAML_EXAMPLE)
            .into());
    }

    Ok(body)
}

/// Validate that parallel sub-query arrays line up.
pub fn require_parallel_lengths(fields: &[(&str, usize)]) -> Result<()> {
    let Some(&(first_name, first_len)) = fields.first() else {
        return Ok(());
    };
    for &(name, len) in &fields[1..] {
        if len != first_len {
            return Err(ValidationError::malformed(
                name,
                format!(
                    "{} has {} entries but {} has {}; parallel arrays must have matching lengths",
                    name, len, first_name, first_len
                ),
            )
            .into());
        }
    }
    Ok(())
}
