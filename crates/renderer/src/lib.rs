//! Subprocess renderer — evaluates definitions with an external binary.
//!
//! Invokes `<binary> eval ...` and surfaces stdout, stderr and the exit
//! code. An optional deadline kills the child when it runs too long.

use agentflow_core::error::RenderError;
use agentflow_core::{RenderOutput, Renderer, ResponseFormat};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Renderer backed by the `pkl` command line.
pub struct PklRenderer {
    binary: String,
    timeout: Option<Duration>,
}

impl PklRenderer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_config(config: &agentflow_config::RendererConfig) -> Self {
        Self::new(config.binary.clone()).with_timeout(config.timeout())
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    async fn run(&self, args: &[&OsStr], subject: &Path) -> Result<RenderOutput, RenderError> {
        debug!(binary = %self.binary, subject = %subject.display(), "Invoking renderer");

        let child = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output();

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(subject = %subject.display(), secs = limit.as_secs(), "Renderer timed out");
                    return Err(RenderError::Timeout {
                        path: subject.to_path_buf(),
                        secs: limit.as_secs(),
                    });
                }
            },
            None => child.await,
        }
        .map_err(|e| RenderError::Spawn {
            binary: self.binary.clone(),
            reason: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            warn!(subject = %subject.display(), exit_code = code, "Renderer failed");
            return Err(RenderError::NonZeroExit {
                code,
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(RenderOutput { stdout, stderr })
    }
}

#[async_trait]
impl Renderer for PklRenderer {
    fn name(&self) -> &str {
        "pkl"
    }

    async fn evaluate(&self, definition: &Path) -> Result<RenderOutput, RenderError> {
        self.run(&[OsStr::new("eval"), definition.as_os_str()], definition)
            .await
    }

    async fn render(
        &self,
        definition: &Path,
        format: ResponseFormat,
        output: &Path,
    ) -> Result<RenderOutput, RenderError> {
        self.run(
            &[
                OsStr::new("eval"),
                OsStr::new("--format"),
                OsStr::new(format.as_str()),
                OsStr::new("--output-path"),
                output.as_os_str(),
                definition.as_os_str(),
            ],
            definition,
        )
        .await
    }

    async fn evaluate_json(&self, definition: &Path) -> Result<serde_json::Value, RenderError> {
        let out = self
            .run(
                &[
                    OsStr::new("eval"),
                    OsStr::new("--format"),
                    OsStr::new("json"),
                    definition.as_os_str(),
                ],
                definition,
            )
            .await?;
        serde_json::from_str(&out.stdout).map_err(|e| {
            RenderError::InvalidOutput(format!("{} is not JSON: {e}", definition.display()))
        })
    }
}

/// Locate a binary the way the shell would: absolute paths as-is, otherwise
/// the first match on `PATH`.
pub fn find_binary(binary: &str) -> Option<PathBuf> {
    let candidate = Path::new(binary);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(binary))
        .find(|p| p.is_file())
}
