//! Route templates and per-request contexts.
//!
//! A [`RouteTemplate`] is built once per configured route. Every inbound
//! request derives its own [`RequestContext`] from it, and every path the
//! request touches is scoped by the request id, so concurrent requests to
//! the same route never share working files.

use agentflow_config::{AgentConfig, RouteConfig};
use agentflow_core::{ActionKind, ResponseFormat};
use std::path::PathBuf;

/// Name of the directory holding request and response descriptors.
pub const API_DIR: &str = "api";

/// Name of the directory holding resource definitions inside a project.
pub const RESOURCES_DIR: &str = "resources";

/// Immutable per-route settings shared by all requests to that route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    pub route_path: String,
    pub project_dir: PathBuf,
    pub workflow_dir: PathBuf,
    pub action_dir: PathBuf,
    pub response_format: ResponseFormat,
}

impl RouteTemplate {
    pub fn from_config(agent: &AgentConfig, route: &RouteConfig) -> Self {
        Self {
            route_path: route.path.clone(),
            project_dir: agent.project_dir.clone(),
            workflow_dir: agent.workflow_dir.clone(),
            action_dir: agent.action_dir.clone(),
            response_format: route.response_type,
        }
    }

    /// Derive a context for a new request with a fresh id.
    pub fn request(&self) -> RequestContext {
        self.request_with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn request_with_id(&self, request_id: impl Into<String>) -> RequestContext {
        let request_id = request_id.into();
        let api_dir = self.action_dir.join(API_DIR).join(&request_id);

        RequestContext {
            agent_dir: self.workflow_dir.join(&request_id),
            project_dir: self.project_dir.clone(),
            action_dir: self.action_dir.clone(),
            request_file: api_dir.join("request.pkl"),
            response_file: api_dir.join("response.pkl"),
            api_dir,
            response_format: self.response_format,
            request_id,
        }
    }
}

/// Everything one request needs to locate its working files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    /// Pristine project the request's staged copy is taken from
    pub project_dir: PathBuf,
    /// Per-request staged copy of the project
    pub agent_dir: PathBuf,
    /// Root of the per-kind output records
    pub action_dir: PathBuf,
    /// Per-request descriptor and signal directory
    pub api_dir: PathBuf,
    pub request_file: PathBuf,
    pub response_file: PathBuf,
    /// Format requested by the route; signalled through its flag file
    pub response_format: ResponseFormat,
}

impl RequestContext {
    /// Resource definitions inside the staged copy.
    pub fn resources_dir(&self) -> PathBuf {
        self.agent_dir.join(RESOURCES_DIR)
    }

    /// Output record of `kind` for this request.
    pub fn output_record(&self, kind: ActionKind) -> PathBuf {
        self.action_dir
            .join(kind.output_dir())
            .join(kind.record_file_name(&self.request_id))
    }

    pub fn flag_file(&self, format: ResponseFormat) -> PathBuf {
        self.api_dir.join(format.flag_file())
    }

    /// Final rendered response for `format`.
    pub fn target_file(&self, format: ResponseFormat) -> PathBuf {
        self.api_dir.join(format!("response.{}", format.extension()))
    }
}
