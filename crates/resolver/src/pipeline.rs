//! One request from descriptor to response bytes.

use agentflow_config::AppConfig;
use agentflow_core::{Error, Renderer, ResponseFormat, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::context::RequestContext;
use crate::descriptor::RequestDescriptor;
use crate::driver::Engine;
use crate::negotiate::ResponseNegotiator;
use crate::watcher::{WaitOptions, wait_for_file};
use crate::workspace;

/// Bytes and headers ready to send back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResponse {
    pub body: Vec<u8>,
    pub content_type: &'static str,
    pub format: ResponseFormat,
}

/// Drives a whole request: staging, execution, negotiation, cleanup.
///
/// Shared by every route; all per-request state lives in the
/// [`RequestContext`] passed to [`Resolver::resolve`].
pub struct Resolver {
    engine: Engine,
    negotiator: ResponseNegotiator,
    action: String,
    schema_package: String,
    response_wait: WaitOptions,
    keep_runs: bool,
}

impl Resolver {
    pub fn new(
        engine: Engine,
        negotiator: ResponseNegotiator,
        action: impl Into<String>,
        schema_package: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            negotiator,
            action: action.into(),
            schema_package: schema_package.into(),
            response_wait: WaitOptions::new(std::time::Duration::from_millis(500)),
            keep_runs: false,
        }
    }

    pub fn with_response_wait(mut self, opts: WaitOptions) -> Self {
        self.response_wait = opts;
        self
    }

    /// Keep staged copies and descriptors after the response is sent.
    pub fn keep_runs(mut self, keep: bool) -> Self {
        self.keep_runs = keep;
        self
    }

    pub fn from_config(renderer: Arc<dyn Renderer>, config: &AppConfig) -> Self {
        let engine = Engine::from_config(renderer.clone(), config);
        let negotiator = ResponseNegotiator::new(renderer, config.resolver.schema_package.clone());
        Self::new(
            engine,
            negotiator,
            config.workflow.action.clone(),
            config.resolver.schema_package.clone(),
        )
        .with_response_wait(
            WaitOptions::new(config.watcher.file_poll())
                .with_optional_timeout(config.watcher.response_timeout()),
        )
        .keep_runs(config.agent.keep_runs)
    }

    /// Run the configured action for one request and read back the response.
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        request: &RequestDescriptor,
    ) -> Result<ResolvedResponse> {
        let result = self.run_once(ctx, request).await;
        if self.keep_runs {
            debug!(request_id = %ctx.request_id, "Keeping run files");
        } else {
            workspace::cleanup(ctx);
        }
        result
    }

    async fn run_once(
        &self,
        ctx: &RequestContext,
        request: &RequestDescriptor,
    ) -> Result<ResolvedResponse> {
        workspace::clear_signals(ctx)?;
        workspace::create_flag(ctx)?;
        tokio::fs::write(
            &ctx.request_file,
            request.to_definition(&self.schema_package),
        )
        .await
        .map_err(|e| Error::io(&ctx.request_file, e))?;

        workspace::stage_workflow(ctx)?;
        workspace::prepare_output_records(ctx, &self.schema_package)?;

        self.engine.run(ctx, &self.action).await?;

        let negotiated = self.negotiator.negotiate(ctx).await?;
        info!(request_id = %ctx.request_id, "Awaiting response");
        wait_for_file(&negotiated.target, self.response_wait).await?;

        let body = tokio::fs::read(&negotiated.target)
            .await
            .map_err(|e| Error::io(&negotiated.target, e))?;

        Ok(ResolvedResponse {
            body,
            content_type: negotiated.content_type,
            format: negotiated.format,
        })
    }
}
