//! Renderer trait — the seam to the external evaluator.
//!
//! The renderer turns one definition file into effects: running a command,
//! calling a model, writing an output record. agentflow never looks inside
//! that evaluation; it only waits for and reads its results.

use async_trait::async_trait;
use std::path::Path;

use crate::error::RenderError;
use crate::format::ResponseFormat;

/// Captured output of one renderer invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutput {
    pub stdout: String,
    pub stderr: String,
}

/// The external renderer.
///
/// Every call is synchronous from the caller's point of view: it returns
/// once the evaluation has finished (or failed).
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Short name for logs (e.g., "pkl").
    fn name(&self) -> &str;

    /// Evaluate a resource definition for its side effects.
    async fn evaluate(&self, definition: &Path) -> Result<RenderOutput, RenderError>;

    /// Render a definition in `format`, writing the bytes to `output`.
    async fn render(
        &self,
        definition: &Path,
        format: ResponseFormat,
        output: &Path,
    ) -> Result<RenderOutput, RenderError>;

    /// Evaluate a definition and return its value as JSON.
    ///
    /// Used to read output records without parsing the authoring language.
    async fn evaluate_json(&self, definition: &Path) -> Result<serde_json::Value, RenderError>;
}
