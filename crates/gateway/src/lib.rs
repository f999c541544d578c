//! HTTP front door for agentflow.
//!
//! Registers one handler per configured route, each resolving the workflow
//! action for every inbound call, plus a health endpoint.
//!
//! Built on Axum. Failures answer the one request with an error status and
//! leave the server running.

pub mod routes;

use agentflow_config::AppConfig;
use agentflow_core::{Error, Renderer, Result};
use agentflow_renderer::PklRenderer;
use agentflow_resolver::{Resolver, RouteTemplate, WaitOptions, wait_for_file};
use axum::{
    Router,
    routing::{any, get},
};
use std::sync::Arc;
use tracing::info;

use routes::RouteState;

/// Path reserved for the health endpoint.
pub const HEALTH_PATH: &str = "/health";

/// Build the router: one handler per configured route plus `/health`.
///
/// The config is validated first, so a pattern path is an error rather than
/// a panic inside the router.
pub fn build_router(resolver: Arc<Resolver>, config: &AppConfig) -> Result<Router> {
    config.validate().map_err(|e| Error::Config {
        message: e.to_string(),
    })?;

    let mut app = Router::new().route(HEALTH_PATH, get(routes::health_handler));

    for route in &config.workflow.routes {
        if route.path == HEALTH_PATH {
            return Err(Error::Config {
                message: format!("route path '{HEALTH_PATH}' is reserved"),
            });
        }

        let state = Arc::new(RouteState {
            template: RouteTemplate::from_config(&config.agent, route),
            methods: route.methods.iter().map(|m| m.to_ascii_uppercase()).collect(),
            body_limit: config.gateway.body_limit_bytes,
            resolver: resolver.clone(),
        });
        info!(
            path = %route.path,
            methods = ?state.methods,
            response_type = %route.response_type,
            "Route registered"
        );
        app = app.merge(
            Router::new()
                .route(&route.path, any(routes::api_handler))
                .with_state(state),
        );
    }

    Ok(app.layer(tower_http::trace::TraceLayer::new_for_http()))
}

/// Start the gateway HTTP server.
///
/// Waits for the project's workflow file, then serves until Ctrl-C.
pub async fn start(config: AppConfig) -> std::result::Result<(), Box<dyn std::error::Error>> {
    config.validate_for_serving()?;

    let workflow = config.agent.workflow_path();
    info!(file = %workflow.display(), "Waiting for workflow file");
    wait_for_file(
        &workflow,
        WaitOptions::new(config.watcher.file_poll())
            .with_optional_timeout(config.watcher.startup_timeout()),
    )
    .await?;

    let renderer: Arc<dyn Renderer> = Arc::new(PklRenderer::from_config(&config.renderer));
    let resolver = Arc::new(Resolver::from_config(renderer, &config));
    let app = build_router(resolver, &config)?;

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        addr = %addr,
        action = %config.workflow.action,
        routes = config.workflow.routes.len(),
        "Gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
