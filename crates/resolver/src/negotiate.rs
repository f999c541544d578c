//! Response negotiation — flag detection and final rendering.

use agentflow_core::{Error, NegotiationError, Renderer, ResponseFormat, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::context::RequestContext;
use crate::descriptor::ResponseDescriptor;

/// First format, in priority order, whose flag file exists in `dir`.
pub fn detect_format(dir: &Path) -> Result<ResponseFormat> {
    ResponseFormat::PRIORITY
        .into_iter()
        .find(|format| dir.join(format.flag_file()).exists())
        .ok_or_else(|| {
            NegotiationError::NoResponseFlag {
                dir: dir.to_path_buf(),
            }
            .into()
        })
}

/// Result of a successful negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    pub format: ResponseFormat,
    /// Where the renderer wrote the response bytes
    pub target: PathBuf,
    pub content_type: &'static str,
}

pub struct ResponseNegotiator {
    renderer: Arc<dyn Renderer>,
    schema_package: String,
}

impl ResponseNegotiator {
    pub fn new(renderer: Arc<dyn Renderer>, schema_package: impl Into<String>) -> Self {
        Self {
            renderer,
            schema_package: schema_package.into(),
        }
    }

    /// Pick the format, write the response descriptor and render it.
    ///
    /// Nothing is written when no flag is present.
    pub async fn negotiate(&self, ctx: &RequestContext) -> Result<Negotiated> {
        let format = detect_format(&ctx.api_dir)?;
        debug!(request_id = %ctx.request_id, %format, "Response flag found");

        let stamp = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .to_string();
        let descriptor = ResponseDescriptor::success(vec![stamp]);
        tokio::fs::write(
            &ctx.response_file,
            descriptor.to_definition(&self.schema_package),
        )
        .await
        .map_err(|e| Error::io(&ctx.response_file, e))?;

        let target = ctx.target_file(format);
        match tokio::fs::remove_file(&target).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io(&target, e)),
        }

        self.renderer
            .render(&ctx.response_file, format, &target)
            .await?;
        info!(request_id = %ctx.request_id, %format, target = %target.display(), "Response rendered");

        Ok(Negotiated {
            format,
            target,
            content_type: format.content_type(),
        })
    }
}
