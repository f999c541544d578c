//! `agentflow serve` — Start the HTTP front door.

use agentflow_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    tracing::debug!(path = %AppConfig::config_path().display(), "Configuration loaded");

    println!("agentflow gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Action:    {}", config.workflow.action);
    println!("   Project:   {}", config.agent.project_dir.display());
    for route in &config.workflow.routes {
        println!(
            "   Route:     {} [{}] -> {}",
            route.path,
            route.methods.join(", "),
            route.response_type
        );
    }

    agentflow_gateway::start(config).await?;

    Ok(())
}
