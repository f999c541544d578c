//! Execution driver — evaluates an action's dependency closure in order.

use agentflow_config::AppConfig;
use agentflow_core::{ActionKind, Error, Renderer, ResourceEntry, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::context::RequestContext;
use crate::graph::execution_order;
use crate::imports::ImportInjector;
use crate::records;
use crate::watcher::{WaitOptions, wait_for_timestamp_change};

/// Execution order for `action`, verified against the catalog.
///
/// Uses a fresh visited set on every call. Every id in the result exists in
/// the catalog.
pub fn plan(catalog: &Catalog, action: &str) -> Result<Vec<String>> {
    if !catalog.contains(action) {
        return Err(Error::MissingResource(action.to_string()));
    }
    let order = execution_order(&catalog.dependency_map(), action, &mut HashSet::new())?;
    if let Some(missing) = order.iter().find(|id| !catalog.contains(id)) {
        return Err(Error::MissingResource(missing.clone()));
    }
    Ok(order)
}

/// Outcome of one successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub action: String,
    /// Resource ids in the order they were evaluated
    pub executed: Vec<String>,
}

pub struct Engine {
    renderer: Arc<dyn Renderer>,
    injector: ImportInjector,
    confirm: Option<WaitOptions>,
}

impl Engine {
    pub fn new(renderer: Arc<dyn Renderer>, injector: ImportInjector) -> Self {
        Self {
            renderer,
            injector,
            confirm: None,
        }
    }

    /// After each evaluation, wait for the resource's output record
    /// timestamp to move.
    pub fn with_confirmation(mut self, opts: WaitOptions) -> Self {
        self.confirm = Some(opts);
        self
    }

    pub fn from_config(renderer: Arc<dyn Renderer>, config: &AppConfig) -> Self {
        let engine = Self::new(renderer, ImportInjector::from_config(&config.resolver));
        if config.resolver.confirm_output_records {
            engine.with_confirmation(
                WaitOptions::new(config.watcher.timestamp_poll())
                    .with_optional_timeout(config.watcher.timestamp_timeout()),
            )
        } else {
            engine
        }
    }

    /// Evaluate `action` and everything it requires, strictly in order.
    /// The first failure halts the run.
    pub async fn run(&self, ctx: &RequestContext, action: &str) -> Result<RunReport> {
        let catalog = Catalog::load(&ctx.resources_dir())?;
        let order = plan(&catalog, action)?;
        info!(
            request_id = %ctx.request_id,
            action,
            resources = order.len(),
            "Processing resources"
        );

        let mut executed = Vec::with_capacity(order.len());
        for id in order {
            let entry = catalog
                .get(&id)
                .ok_or_else(|| Error::MissingResource(id.clone()))?;
            self.execute(ctx, entry).await.inspect_err(|e| {
                warn!(request_id = %ctx.request_id, resource = %id, error = %e, "Resource failed");
            })?;
            executed.push(id);
        }

        info!(request_id = %ctx.request_id, action, "Resources finished processing");
        Ok(RunReport {
            action: action.to_string(),
            executed,
        })
    }

    async fn execute(&self, ctx: &RequestContext, entry: &ResourceEntry) -> Result<()> {
        info!(request_id = %ctx.request_id, resource = %entry.id, "Executing resource");
        self.injector.inject(&entry.file, ctx).await?;

        let confirm = self.confirm.zip(entry.kind.filter(|k| *k != ActionKind::Data));
        let previous = match confirm {
            Some((_, kind)) => {
                records::timestamp_or_zero(
                    self.renderer.as_ref(),
                    &ctx.output_record(kind),
                    kind,
                    &entry.id,
                )
                .await?
            }
            None => 0.0,
        };

        let output = self.renderer.evaluate(&entry.file).await?;
        if !output.stderr.trim().is_empty() {
            debug!(resource = %entry.id, stderr = %output.stderr.trim(), "Renderer stderr");
        }

        if let Some((opts, kind)) = confirm {
            let ts = wait_for_timestamp_change(
                self.renderer.as_ref(),
                &ctx.output_record(kind),
                kind,
                &entry.id,
                previous,
                opts,
            )
            .await?;
            debug!(resource = %entry.id, timestamp = ts, "Output record updated");
        }
        Ok(())
    }
}
