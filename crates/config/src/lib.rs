//! Configuration loading, validation, and management for agentflow.
//!
//! Loads configuration from `$AGENTFLOW_CONFIG` or `~/.agentflow/config.toml`
//! with environment variable overrides. Validates all settings at startup.

use agentflow_core::ResponseFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// HTTP methods a route may allow.
const KNOWN_METHODS: [&str; 9] = [
    "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "TRACE", "CONNECT",
];

/// Characters that would turn a route path into a capture or wildcard.
const ROUTE_PATH_RESERVED: [char; 4] = [':', '*', '{', '}'];

/// The root configuration structure.
///
/// Maps directly to `~/.agentflow/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Agent directory layout
    #[serde(default)]
    pub agent: AgentConfig,

    /// Target action and API routes
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// External renderer invocation
    #[serde(default)]
    pub renderer: RendererConfig,

    /// Filesystem polling intervals and deadlines
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Resolution behavior
    #[serde(default)]
    pub resolver: ResolverConfig,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum accepted request body size
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    3000
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Pristine agent project: `resources/` plus the workflow file
    #[serde(default = "default_project_dir")]
    pub project_dir: PathBuf,

    /// Root under which each request gets its own staged copy of the project
    #[serde(default = "default_workflow_dir")]
    pub workflow_dir: PathBuf,

    /// Root of per-kind output records and per-request API files
    #[serde(default = "default_action_dir")]
    pub action_dir: PathBuf,

    /// Workflow file name, relative to `project_dir`
    #[serde(default = "default_workflow_file")]
    pub workflow_file: String,

    /// Keep staged per-request copies after the response is sent
    #[serde(default)]
    pub keep_runs: bool,
}

fn default_project_dir() -> PathBuf {
    PathBuf::from("/agent/project")
}
fn default_workflow_dir() -> PathBuf {
    PathBuf::from("/agent/workflow")
}
fn default_action_dir() -> PathBuf {
    PathBuf::from("/agent/actions")
}
fn default_workflow_file() -> String {
    "workflow.pkl".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            project_dir: default_project_dir(),
            workflow_dir: default_workflow_dir(),
            action_dir: default_action_dir(),
            workflow_file: default_workflow_file(),
            keep_runs: false,
        }
    }
}

impl AgentConfig {
    /// Absolute path of the project's workflow file.
    pub fn workflow_path(&self) -> PathBuf {
        self.project_dir.join(&self.workflow_file)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Resource id every request resolves
    #[serde(default = "default_action")]
    pub action: String,

    /// API routes served by the gateway
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

fn default_action() -> String {
    "responseResource".into()
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            action: default_action(),
            routes: vec![],
        }
    }
}

/// One API route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// URL path (must start with `/`)
    pub path: String,

    /// Allowed HTTP methods (default: GET)
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,

    /// Response encoding for this route (default: json)
    #[serde(default)]
    pub response_type: ResponseFormat,
}

fn default_methods() -> Vec<String> {
    vec!["GET".into()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Renderer binary, resolved through PATH when not absolute
    #[serde(default = "default_renderer_binary")]
    pub binary: String,

    /// Per-invocation deadline in seconds (0 = unbounded)
    #[serde(default)]
    pub timeout_secs: u64,
}

fn default_renderer_binary() -> String {
    "pkl".into()
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            binary: default_renderer_binary(),
            timeout_secs: 0,
        }
    }
}

impl RendererConfig {
    pub fn timeout(&self) -> Option<Duration> {
        non_zero_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    #[serde(default = "default_file_poll_ms")]
    pub file_poll_ms: u64,

    #[serde(default = "default_timestamp_poll_ms")]
    pub timestamp_poll_ms: u64,

    /// Deadline for the rendered response file (0 = wait indefinitely)
    #[serde(default = "default_wait_secs")]
    pub response_timeout_secs: u64,

    /// Deadline for an output record timestamp to change (0 = wait indefinitely)
    #[serde(default = "default_wait_secs")]
    pub timestamp_timeout_secs: u64,

    /// Deadline for the workflow file at startup (0 = wait indefinitely)
    #[serde(default)]
    pub startup_timeout_secs: u64,
}

fn default_file_poll_ms() -> u64 {
    500
}
fn default_timestamp_poll_ms() -> u64 {
    100
}
fn default_wait_secs() -> u64 {
    60
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            file_poll_ms: default_file_poll_ms(),
            timestamp_poll_ms: default_timestamp_poll_ms(),
            response_timeout_secs: default_wait_secs(),
            timestamp_timeout_secs: default_wait_secs(),
            startup_timeout_secs: 0,
        }
    }
}

impl WatcherConfig {
    pub fn file_poll(&self) -> Duration {
        Duration::from_millis(self.file_poll_ms)
    }

    pub fn timestamp_poll(&self) -> Duration {
        Duration::from_millis(self.timestamp_poll_ms)
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.response_timeout_secs)
    }

    pub fn timestamp_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.timestamp_timeout_secs)
    }

    pub fn startup_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.startup_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Schema package URI prefix used for generated imports and headers
    #[serde(default = "default_schema_package")]
    pub schema_package: String,

    /// After each evaluation, wait for the resource's output record timestamp to change
    #[serde(default)]
    pub confirm_output_records: bool,

    /// Rewrite `@(expr)` shorthand into native interpolation while injecting imports
    #[serde(default = "default_true")]
    pub expand_interpolation: bool,
}

fn default_schema_package() -> String {
    "package://schema.agentflow.dev/core@0.1.0".into()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            schema_package: default_schema_package(),
            confirm_output_records: false,
            expand_interpolation: true,
        }
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl AppConfig {
    /// Load configuration from `$AGENTFLOW_CONFIG` or the default path.
    ///
    /// Environment variables override file values:
    /// - `AGENTFLOW_HOST`, `AGENTFLOW_PORT`
    /// - `AGENTFLOW_ACTION`
    /// - `AGENTFLOW_RENDERER`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;

        if let Ok(host) = std::env::var("AGENTFLOW_HOST") {
            config.gateway.host = host;
        }

        if let Ok(port) = std::env::var("AGENTFLOW_PORT") {
            config.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("AGENTFLOW_PORT is not a port: '{port}'"))
            })?;
        }

        if let Ok(action) = std::env::var("AGENTFLOW_ACTION") {
            config.workflow.action = action;
        }

        if let Ok(binary) = std::env::var("AGENTFLOW_RENDERER") {
            config.renderer.binary = binary;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Config file in effect: `$AGENTFLOW_CONFIG` or `~/.agentflow/config.toml`.
    pub fn config_path() -> PathBuf {
        std::env::var("AGENTFLOW_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"))
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".agentflow")
    }

    /// Upper-case route methods so comparisons against requests are exact.
    fn normalize(&mut self) {
        for route in &mut self.workflow.routes {
            for method in &mut route.methods {
                *method = method.trim().to_ascii_uppercase();
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workflow.action.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "workflow.action must name a resource".into(),
            ));
        }

        if self.watcher.file_poll_ms == 0 || self.watcher.timestamp_poll_ms == 0 {
            return Err(ConfigError::ValidationError(
                "watcher poll intervals must be > 0".into(),
            ));
        }

        if self.renderer.binary.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "renderer.binary must not be empty".into(),
            ));
        }

        let project = &self.agent.project_dir;
        for (name, dir) in [
            ("workflow_dir", &self.agent.workflow_dir),
            ("action_dir", &self.agent.action_dir),
        ] {
            if dir.starts_with(project) {
                return Err(ConfigError::ValidationError(format!(
                    "agent.{name} '{}' must not be inside agent.project_dir '{}'",
                    dir.display(),
                    project.display()
                )));
            }
        }

        let mut seen = HashSet::new();
        for route in &self.workflow.routes {
            if !route.path.starts_with('/') {
                return Err(ConfigError::ValidationError(format!(
                    "route path '{}' must start with '/'",
                    route.path
                )));
            }
            if let Some(bad) = route.path.chars().find(|c| ROUTE_PATH_RESERVED.contains(c)) {
                return Err(ConfigError::ValidationError(format!(
                    "route path '{}' must be literal; '{bad}' is not allowed",
                    route.path
                )));
            }
            if !seen.insert(route.path.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "route path '{}' is declared twice",
                    route.path
                )));
            }
            if route.methods.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "route '{}' allows no methods",
                    route.path
                )));
            }
            if let Some(bad) = route
                .methods
                .iter()
                .find(|m| !KNOWN_METHODS.contains(&m.to_ascii_uppercase().as_str()))
            {
                return Err(ConfigError::ValidationError(format!(
                    "route '{}' allows unknown method '{bad}'",
                    route.path
                )));
            }
        }

        Ok(())
    }

    /// Stricter check run before serving: at least one route must exist.
    pub fn validate_for_serving(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.workflow.routes.is_empty() {
            return Err(ConfigError::ValidationError(
                "no [[workflow.routes]] configured; nothing to serve".into(),
            ));
        }
        Ok(())
    }

    /// Generate a default config TOML string with one example route.
    pub fn default_toml() -> String {
        let mut config = Self::default();
        config.workflow.routes.push(RouteConfig {
            path: "/api/v1/run".into(),
            methods: vec!["GET".into(), "POST".into()],
            response_type: ResponseFormat::Json,
        });
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
