//! Scripted renderer for resolver tests.

use agentflow_core::{RenderError, RenderOutput, Renderer, ResponseFormat};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

type Effect = Box<dyn Fn(&Path) + Send + Sync>;

/// Renderer that records every call instead of spawning a process.
///
/// `evaluate_json` reads the file itself as JSON, so tests write output
/// records in JSON form. `render` writes `rendered:<format>` to the output.
pub struct FakeRenderer {
    pub evaluated: Mutex<Vec<PathBuf>>,
    pub rendered: Mutex<Vec<(PathBuf, ResponseFormat, PathBuf)>>,
    fail_on: Option<String>,
    effect: Option<Effect>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self {
            evaluated: Mutex::new(Vec::new()),
            rendered: Mutex::new(Vec::new()),
            fail_on: None,
            effect: None,
        }
    }

    /// Fail `evaluate` for any definition whose file name is `name`.
    pub fn failing_on(mut self, name: &str) -> Self {
        self.fail_on = Some(name.to_string());
        self
    }

    /// Run `effect` after each successful `evaluate`.
    pub fn with_effect(mut self, effect: impl Fn(&Path) + Send + Sync + 'static) -> Self {
        self.effect = Some(Box::new(effect));
        self
    }

    /// File names of evaluated definitions, in call order.
    pub fn evaluated_names(&self) -> Vec<String> {
        self.evaluated
            .lock()
            .unwrap()
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .collect()
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    fn name(&self) -> &str {
        "fake"
    }

    async fn evaluate(&self, definition: &Path) -> Result<RenderOutput, RenderError> {
        self.evaluated.lock().unwrap().push(definition.to_path_buf());

        let name = definition
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.fail_on.as_deref() == Some(name.as_str()) {
            return Err(RenderError::NonZeroExit {
                code: 1,
                stderr: format!("{name} failed"),
            });
        }

        if let Some(effect) = &self.effect {
            effect(definition);
        }
        Ok(RenderOutput::default())
    }

    async fn render(
        &self,
        definition: &Path,
        format: ResponseFormat,
        output: &Path,
    ) -> Result<RenderOutput, RenderError> {
        self.rendered.lock().unwrap().push((
            definition.to_path_buf(),
            format,
            output.to_path_buf(),
        ));
        std::fs::write(output, format!("rendered:{format}"))
            .map_err(|e| RenderError::InvalidOutput(e.to_string()))?;
        Ok(RenderOutput::default())
    }

    async fn evaluate_json(&self, definition: &Path) -> Result<serde_json::Value, RenderError> {
        let text = std::fs::read_to_string(definition)
            .map_err(|e| RenderError::InvalidOutput(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| RenderError::InvalidOutput(e.to_string()))
    }
}
