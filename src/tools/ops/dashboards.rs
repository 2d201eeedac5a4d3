//! Dashboard CRUD, YAML round-trips, tags and templates.

use crate::tools::catalog::ToolHints;
use crate::tools::defaults::DefaultPolicy;
use crate::tools::handler::Operation;
use crate::tools::request::{Endpoint, HttpMethod, NormalizedRequest};
use crate::types::Result;
use crate::validation::{require_dashboard_id, require_dashboard_yaml, require_non_empty};
use schemars::JsonSchema;
use serde::Deserialize;

const DASHBOARDS: Endpoint = Endpoint::get("/api/v1/metrics/{project_id}/dashboards");
const DASHBOARD: Endpoint = Endpoint::get("/api/v1/metrics/{project_id}/dashboards/{id}");
const DASHBOARD_YAML: Endpoint = Endpoint::get("/api/v1/metrics/{project_id}/dashboards/{id}/yaml").with_text_response();
const CREATE_DASHBOARD: Endpoint =
    Endpoint::get("/api/v1/metrics/{project_id}/dashboards/yaml").with_method(HttpMethod::Post);
const UPDATE_DASHBOARD_YAML: Endpoint =
    Endpoint::get("/api/v1/metrics/{project_id}/dashboards/{id}/yaml").with_method(HttpMethod::Put);
const DELETE_DASHBOARD: Endpoint = DASHBOARD.with_method(HttpMethod::Delete);
const DASHBOARD_TAGS: Endpoint = Endpoint::get("/api/v1/metrics/{project_id}/dashboards/tags");
const DASHBOARD_TEMPLATES: Endpoint = Endpoint::get("/api/v1/metrics/{project_id}/dashboard-templates");
const DASHBOARD_TEMPLATE: Endpoint = Endpoint::get("/api/v1/metrics/{project_id}/dashboard-templates/{id}");

/// Arguments of tools scoped to a project only.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ProjectInput {
    /// Uptrace project ID. Defaults to the configured project.
    #[serde(default)]
    pub project_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct DashboardInput {
    /// Uptrace project ID. Defaults to the configured project.
    #[serde(default)]
    pub project_id: Option<i64>,
    /// Dashboard ID.
    #[serde(default)]
    pub dashboard_id: Option<i64>,
}

impl DashboardInput {
    fn request(self, endpoint: Endpoint, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        let id = require_dashboard_id(self.dashboard_id)?;
        Ok(NormalizedRequest::new(endpoint, policy.project_id(self.project_id)).resource(id))
    }
}

#[derive(Debug)]
pub struct ListDashboards;

impl Operation for ListDashboards {
    type Input = ProjectInput;

    const NAME: &'static str = "list_dashboards";
    const TITLE: &'static str = "List dashboards";
    const DESCRIPTION: &'static str = "List dashboards configured in Uptrace. \
        Use to view available dashboards for monitoring and visualization. \
        Documentation: https://uptrace.dev/llms.txt#features > 'Dashboards'";
    const HINTS: ToolHints = ToolHints::READ;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        Ok(NormalizedRequest::new(DASHBOARDS, policy.project_id(input.project_id)))
    }
}

#[derive(Debug)]
pub struct GetDashboard;

impl Operation for GetDashboard {
    type Input = DashboardInput;

    const NAME: &'static str = "get_dashboard";
    const TITLE: &'static str = "Get dashboard";
    const DESCRIPTION: &'static str = "Get a dashboard by ID from Uptrace. \
        Use to retrieve dashboard details including grid rows and items. \
        Documentation: https://uptrace.dev/llms.txt#features > 'Dashboards'";
    const HINTS: ToolHints = ToolHints::READ;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        input.request(DASHBOARD, policy)
    }
}

#[derive(Debug)]
pub struct GetDashboardYaml;

impl Operation for GetDashboardYaml {
    type Input = DashboardInput;

    const NAME: &'static str = "get_dashboard_yaml";
    const TITLE: &'static str = "Get dashboard YAML";
    const DESCRIPTION: &'static str = "Export a dashboard as its YAML definition. \
        The YAML is returned verbatim and can be edited and passed to update_dashboard_yaml. \
        YAML format guide: https://uptrace.dev/raw/features/dashboards.md";
    const HINTS: ToolHints = ToolHints::READ;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        input.request(DASHBOARD_YAML, policy)
    }
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct CreateDashboardInput {
    /// Uptrace project ID. Defaults to the configured project.
    #[serde(default)]
    pub project_id: Option<i64>,
    /// YAML dashboard definition (`schema`, `name`, `version` and `tags` are required).
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug)]
pub struct CreateDashboard;

impl Operation for CreateDashboard {
    type Input = CreateDashboardInput;

    const NAME: &'static str = "create_dashboard";
    const TITLE: &'static str = "Create dashboard";
    const DESCRIPTION: &'static str = "Create a new dashboard from YAML definition. \
        Supports grid-based and table-based dashboards with metrics queries. \
        Use PromQL-style expressions to visualize spans, events, logs, and metrics. \
        Full YAML format guide: https://uptrace.dev/raw/features/dashboards.md, \
        it is necessary to reference the documentation to use this tool correctly.";
    const HINTS: ToolHints = ToolHints::CREATE;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        let body = require_dashboard_yaml(input.body)?;
        Ok(NormalizedRequest::new(CREATE_DASHBOARD, policy.project_id(input.project_id)).yaml_body(body))
    }
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct UpdateDashboardYamlInput {
    /// Uptrace project ID. Defaults to the configured project.
    #[serde(default)]
    pub project_id: Option<i64>,
    /// Dashboard ID.
    #[serde(default)]
    pub dashboard_id: Option<i64>,
    /// Replacement YAML definition (`schema`, `name`, `version` and `tags` are required).
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug)]
pub struct UpdateDashboardYaml;

impl Operation for UpdateDashboardYaml {
    type Input = UpdateDashboardYamlInput;

    const NAME: &'static str = "update_dashboard_yaml";
    const TITLE: &'static str = "Update dashboard from YAML";
    const DESCRIPTION: &'static str = "Replace an existing dashboard with a YAML definition. \
        Overwrites the dashboard's grid and table items; fetch the current definition with \
        get_dashboard_yaml first. YAML format guide: https://uptrace.dev/raw/features/dashboards.md";
    const HINTS: ToolHints = ToolHints::DESTRUCTIVE;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        let id = require_dashboard_id(input.dashboard_id)?;
        let body = require_dashboard_yaml(input.body)?;
        Ok(NormalizedRequest::new(UPDATE_DASHBOARD_YAML, policy.project_id(input.project_id))
            .resource(id)
            .yaml_body(body))
    }
}

#[derive(Debug)]
pub struct DeleteDashboard;

impl Operation for DeleteDashboard {
    type Input = DashboardInput;

    const NAME: &'static str = "delete_dashboard";
    const TITLE: &'static str = "Delete dashboard";
    const DESCRIPTION: &'static str = "Delete a dashboard by ID. This cannot be undone.";
    const HINTS: ToolHints = ToolHints::DESTRUCTIVE;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        input.request(DELETE_DASHBOARD, policy)
    }
}

#[derive(Debug)]
pub struct ListDashboardTags;

impl Operation for ListDashboardTags {
    type Input = ProjectInput;

    const NAME: &'static str = "list_dashboard_tags";
    const TITLE: &'static str = "List dashboard tags";
    const DESCRIPTION: &'static str = "List the tags used across the project's dashboards.";
    const HINTS: ToolHints = ToolHints::READ;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        Ok(NormalizedRequest::new(DASHBOARD_TAGS, policy.project_id(input.project_id)))
    }
}

#[derive(Debug)]
pub struct ListDashboardTemplates;

impl Operation for ListDashboardTemplates {
    type Input = ProjectInput;

    const NAME: &'static str = "list_dashboard_templates";
    const TITLE: &'static str = "List dashboard templates";
    const DESCRIPTION: &'static str = "List prebuilt dashboard templates available to the project. \
        Templates are a good starting point for create_dashboard.";
    const HINTS: ToolHints = ToolHints::READ;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        Ok(NormalizedRequest::new(DASHBOARD_TEMPLATES, policy.project_id(input.project_id)))
    }
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct DashboardTemplateInput {
    /// Uptrace project ID. Defaults to the configured project.
    #[serde(default)]
    pub project_id: Option<i64>,
    /// Template ID as returned by list_dashboard_templates.
    #[serde(default)]
    pub template_id: Option<String>,
}

#[derive(Debug)]
pub struct GetDashboardTemplate;

impl Operation for GetDashboardTemplate {
    type Input = DashboardTemplateInput;

    const NAME: &'static str = "get_dashboard_template";
    const TITLE: &'static str = "Get dashboard template";
    const DESCRIPTION: &'static str = "Get a dashboard template by ID, including its YAML definition.";
    const HINTS: ToolHints = ToolHints::READ;

    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest> {
        let template_id = require_non_empty(input.template_id, "template_id")?;
        Ok(NormalizedRequest::new(DASHBOARD_TEMPLATE, policy.project_id(input.project_id)).resource(template_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::handler::parse_arguments;
    use crate::tools::request::{ResponseKind, YAML_CONTENT_TYPE};
    use crate::types::{Error, ValidationKind};
    use crate::validation::DASHBOARD_YAML_EXAMPLE;
    use serde_json::json;

    fn policy() -> DefaultPolicy {
        DefaultPolicy::new(7, std::time::Duration::from_secs(3600), 100, "").unwrap()
    }

    fn normalize<O: Operation>(args: serde_json::Value) -> Result<NormalizedRequest> {
        O::normalize(parse_arguments(args)?, &policy())
    }

    fn validation_kind(err: Error) -> ValidationKind {
        match err {
            Error::Validation(v) => v.kind,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_create_posts_yaml_body() {
        let call = normalize::<CreateDashboard>(json!({"body": DASHBOARD_YAML_EXAMPLE}))
            .unwrap()
            .to_api_call()
            .unwrap();

        assert_eq!(call.method, HttpMethod::Post);
        assert_eq!(call.path(), "/api/v1/metrics/7/dashboards/yaml");
        let body = call.body.unwrap();
        assert_eq!(body.content_type, YAML_CONTENT_TYPE);
        assert_eq!(body.text, DASHBOARD_YAML_EXAMPLE);
        assert!(call.query.is_empty());
    }

    #[test]
    fn test_create_rejects_missing_body() {
        let err = normalize::<CreateDashboard>(json!({})).unwrap_err();
        assert!(err.to_string().contains(DASHBOARD_YAML_EXAMPLE));
        assert_eq!(validation_kind(err), ValidationKind::Missing);
    }

    #[test]
    fn test_update_checks_id_before_body() {
        let err = normalize::<UpdateDashboardYaml>(json!({"body": ""})).unwrap_err();
        assert!(err.to_string().contains("dashboard_id"));

        let err = normalize::<UpdateDashboardYaml>(json!({"dashboard_id": 3, "body": "name: x"})).unwrap_err();
        assert_eq!(validation_kind(err), ValidationKind::Malformed);
    }

    #[test]
    fn test_update_puts_to_dashboard_yaml() {
        let call = normalize::<UpdateDashboardYaml>(json!({
            "project_id": 2,
            "dashboard_id": 3,
            "body": "schema: v3\nname: X\nversion: 2\ntags: []\n",
        }))
        .unwrap()
        .to_api_call()
        .unwrap();
        assert_eq!(call.method, HttpMethod::Put);
        assert_eq!(call.path(), "/api/v1/metrics/2/dashboards/3/yaml");
    }

    #[test]
    fn test_delete_and_get_share_path() {
        let get = normalize::<GetDashboard>(json!({"dashboard_id": 11})).unwrap().to_api_call().unwrap();
        let delete = normalize::<DeleteDashboard>(json!({"dashboard_id": 11})).unwrap().to_api_call().unwrap();
        assert_eq!(get.path(), delete.path());
        assert_eq!(get.method, HttpMethod::Get);
        assert_eq!(delete.method, HttpMethod::Delete);
    }

    #[test]
    fn test_negative_dashboard_id_is_malformed() {
        let err = normalize::<DeleteDashboard>(json!({"dashboard_id": -4})).unwrap_err();
        assert_eq!(validation_kind(err), ValidationKind::Malformed);
    }

    #[test]
    fn test_get_yaml_expects_text() {
        let req = normalize::<GetDashboardYaml>(json!({"dashboard_id": 1})).unwrap();
        assert_eq!(req.endpoint.response, ResponseKind::Text);
    }

    #[test]
    fn test_template_id_required() {
        let err = normalize::<GetDashboardTemplate>(json!({"template_id": ""})).unwrap_err();
        assert_eq!(validation_kind(err), ValidationKind::Missing);

        let call = normalize::<GetDashboardTemplate>(json!({"template_id": "k8s-pods"}))
            .unwrap()
            .to_api_call()
            .unwrap();
        assert_eq!(call.path(), "/api/v1/metrics/7/dashboard-templates/k8s-pods");
    }

    #[test]
    fn test_project_only_tools() {
        let tags = normalize::<ListDashboardTags>(json!({"project_id": 0})).unwrap();
        assert_eq!(tags.to_api_call().unwrap().path(), "/api/v1/metrics/7/dashboards/tags");
        assert!(tags.time_range.is_none());
        assert!(tags.limit.is_none());

        let templates = normalize::<ListDashboardTemplates>(json!({})).unwrap();
        assert_eq!(templates.to_api_call().unwrap().path(), "/api/v1/metrics/7/dashboard-templates");
    }
}
