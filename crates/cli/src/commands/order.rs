//! `agentflow order` — Print the execution order for an action.

use agentflow_config::AppConfig;
use agentflow_resolver::{Catalog, context::RESOURCES_DIR, plan};
use std::path::{Path, PathBuf};

pub async fn run(
    action: Option<String>,
    resources: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let action = action.unwrap_or_else(|| config.workflow.action.clone());
    let resources = resources.unwrap_or_else(|| config.agent.project_dir.join(RESOURCES_DIR));

    for (step, line) in render_order(&resources, &action)?.iter().enumerate() {
        println!("{:>3}. {line}", step + 1);
    }
    Ok(())
}

/// One line per resource in execution order: id, kind and file.
fn render_order(resources: &Path, action: &str) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let catalog = Catalog::load(resources)?;
    let order = plan(&catalog, action)?;

    Ok(order
        .iter()
        .filter_map(|id| catalog.get(id))
        .map(|entry| {
            let kind = entry
                .kind
                .map(|k| k.to_string())
                .unwrap_or_else(|| "-".into());
            format!("{} ({kind}) {}", entry.id, entry.file.display())
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_chain_in_dependency_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pkl"), "id = \"A\"\n").unwrap();
        std::fs::write(
            dir.path().join("b.pkl"),
            "id = \"B\"\nrequires { \"A\" }\nrun {\n  exec {\n  }\n}\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("c.pkl"), "id = \"C\"\nrequires { \"B\" }\n").unwrap();

        let lines = render_order(dir.path(), "C").unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("A (-)"));
        assert!(lines[1].starts_with("B (exec)"));
        assert!(lines[2].starts_with("C (-)"));
    }

    #[test]
    fn unknown_action_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pkl"), "id = \"A\"\n").unwrap();
        assert!(render_order(dir.path(), "missing").is_err());
    }
}
