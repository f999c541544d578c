//! `agentflow doctor` — Diagnose system health.

use agentflow_config::AppConfig;
use agentflow_renderer::find_binary;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("agentflow doctor — System Diagnostics");
    println!("=====================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_path();
    let config = match AppConfig::load() {
        Ok(config) => {
            if config_path.exists() {
                println!("  ✅ Config file valid: {}", config_path.display());
            } else {
                println!("  ⚠️  No config file at {}, using defaults", config_path.display());
                issues += 1;
            }
            config
        }
        Err(e) => {
            println!("  ❌ Config file invalid: {e}");
            println!("\n  1 issue found. Fix the config and run again.");
            return Ok(());
        }
    };

    if config.workflow.routes.is_empty() {
        println!("  ⚠️  No [[workflow.routes]] configured — `serve` will refuse to start");
        issues += 1;
    } else {
        println!("  ✅ {} route(s) configured", config.workflow.routes.len());
    }

    match find_binary(&config.renderer.binary) {
        Some(path) => println!("  ✅ Renderer found: {}", path.display()),
        None => {
            println!("  ❌ Renderer '{}' not found on PATH", config.renderer.binary);
            issues += 1;
        }
    }

    let workflow = config.agent.workflow_path();
    if workflow.exists() {
        println!("  ✅ Workflow file exists: {}", workflow.display());
    } else {
        println!("  ⚠️  Workflow file missing: {}", workflow.display());
        issues += 1;
    }

    let resources = config.agent.project_dir.join(agentflow_resolver::context::RESOURCES_DIR);
    match agentflow_resolver::Catalog::load(&resources) {
        Ok(catalog) => {
            println!("  ✅ {} resource(s) in {}", catalog.len(), resources.display());
            match agentflow_resolver::plan(&catalog, &config.workflow.action) {
                Ok(order) => println!(
                    "  ✅ Action '{}' resolves to {} step(s)",
                    config.workflow.action,
                    order.len()
                ),
                Err(e) => {
                    println!("  ❌ Action '{}' does not resolve: {e}", config.workflow.action);
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ❌ Resources unreadable: {e}");
            issues += 1;
        }
    }

    for (label, dir) in [
        ("Workflow", &config.agent.workflow_dir),
        ("Action", &config.agent.action_dir),
    ] {
        if dir.exists() {
            println!("  ✅ {label} directory exists: {}", dir.display());
        } else {
            println!("  ⚠️  {label} directory missing (created on first request): {}", dir.display());
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
